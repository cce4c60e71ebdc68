use super::models::{CompletionRequest, Usage};
use crate::config::Secret;
use anyhow::Context;
use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Response from LLM including content and usage stats
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A generative completion service.
///
/// Any error is a transport failure from the caller's point of view: network,
/// quota, or a response that could not be decoded.
#[allow(async_fn_in_trait)]
pub trait CompletionProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// 429 responses are retried this many times before the call fails.
const RATE_LIMIT_RETRIES: u32 = 3;
/// First fallback wait; doubles on every further retry.
const BASE_DELAY: Duration = Duration::from_secs(2);
/// Server hints longer than this are ignored in favour of the fallback.
const MAX_HINTED_DELAY: Duration = Duration::from_secs(120);

/// How long to wait before retry number `retry` (1-based) of a rate-limited call.
///
/// A `Retry-After` header wins, then a hint in the error message such as
/// "try again in 1.5s", then doubling from [`BASE_DELAY`].
fn rate_limit_delay(headers: &HeaderMap, body: &str, retry: u32) -> Duration {
    header_delay(headers)
        .or_else(|| message_delay(body))
        .filter(|delay| *delay <= MAX_HINTED_DELAY)
        .unwrap_or_else(|| BASE_DELAY * 2u32.pow(retry.saturating_sub(1).min(8)))
}

fn header_delay(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn message_delay(body: &str) -> Option<Duration> {
    static HINT: OnceLock<Regex> = OnceLock::new();
    let hint = HINT.get_or_init(|| {
        Regex::new(r"(?i)(?:retry after|try again in)\s+(\d+(?:\.\d+)?)\s*(ms)?")
            .expect("rate limit hint pattern is valid")
    });

    let caps = hint.captures(body)?;
    let value: f64 = caps[1].parse().ok()?;
    let secs = if caps.get(2).is_some() { value / 1000.0 } else { value };
    Duration::try_from_secs_f64(secs).ok()
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Secret,
    model: String,
}

impl OpenAiClient {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1/`.
    pub fn new(
        base_url: &Url,
        api_key: Secret,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = base_url
            .join("chat/completions")
            .context("Invalid completion endpoint")?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionProvider for OpenAiClient {
    /// Includes automatic retry with exponential backoff for rate limits
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: request.system,
                },
                Message {
                    role: "user",
                    content: request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let mut retry_count = 0;

        loop {
            let response = self
                .http
                .post(self.endpoint.clone())
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key.expose()))
                .json(&body)
                .send()
                .await
                .context("Completion request failed")?;

            let status = response.status();
            let headers = response.headers().clone();
            let text = response
                .text()
                .await
                .context("Failed to read completion response")?;

            if status.is_success() {
                return parse_chat_response(&text);
            }

            if status.as_u16() == 429 && retry_count < RATE_LIMIT_RETRIES {
                retry_count += 1;
                let delay = rate_limit_delay(&headers, &text, retry_count);
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = retry_count,
                    max = RATE_LIMIT_RETRIES,
                    "completion service rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let error_msg = match status.as_u16() {
                401 => "Invalid completion API key (401). Check OPENAI_API_KEY.".to_string(),
                429 => format!(
                    "Rate limited by the completion service after {} retries.",
                    retry_count
                ),
                500..=599 => format!(
                    "Completion service error ({}). The service may be temporarily unavailable.",
                    status
                ),
                _ => format!(
                    "Completion API error {}: {}",
                    status,
                    crate::github::sanitize_error_body(&text)
                ),
            };
            return Err(anyhow::anyhow!("{}", error_msg));
        }
    }
}

fn parse_chat_response(text: &str) -> anyhow::Result<LlmResponse> {
    let parsed: ChatResponse = serde_json::from_str(text).map_err(|e| {
        anyhow::anyhow!(
            "Failed to parse completion response: {} ({})",
            e,
            crate::util::truncate(text, 200)
        )
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Completion response contained no choices"))?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("completion hit the output token budget; content may be cut off");
    }

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        usage: parsed.usage,
    })
}
