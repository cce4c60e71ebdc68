use clap::Parser;
use issuefix::config::{Config, Tuning};
use issuefix::context::{assemble, FileTreeSource, LocalCheckout};
use issuefix::error::{FixError, Result};
use issuefix::fix::{self, RunOptions, RunSummary};
use issuefix::github::GitHubClient;
use issuefix::llm::OpenAiClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "issuefix",
    about = "Generate and apply code changes for a GitHub issue",
    version
)]
struct Args {
    /// Working copy to write changes into (defaults to current directory)
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Tuning file (defaults to issuefix.toml in the working copy, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// List files from the working copy instead of the GitHub contents API
    #[arg(long)]
    local_tree: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(&args).await {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), "{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(args: &Args) -> Result<RunSummary> {
    let workdir = args.workdir.canonicalize().map_err(|e| {
        FixError::InvalidConfiguration(format!(
            "cannot open working directory {}: {}",
            args.workdir.display(),
            e
        ))
    })?;

    let config = Config::from_env(|| Tuning::load(args.config.as_deref(), &workdir))?;

    let timeout = Duration::from_secs(config.tuning.request_timeout_secs);
    let github = GitHubClient::new(
        config.github_api_url.clone(),
        config.github_token.clone(),
        config.repo.clone(),
        timeout,
    )
    .map_err(|e| FixError::InvalidConfiguration(format!("{:#}", e)))?;
    let openai = OpenAiClient::new(
        &config.openai_base_url,
        config.openai_api_key.clone(),
        config.tuning.model.clone(),
        timeout,
    )
    .map_err(|e| FixError::InvalidConfiguration(format!("{:#}", e)))?;
    tracing::info!(
        repo = %config.repo,
        issue = config.issue_number,
        model = %openai.model(),
        dry_run = args.dry_run,
        "starting remediation"
    );

    let options = RunOptions {
        workdir: workdir.clone(),
        dry_run: args.dry_run,
    };

    if args.local_tree {
        let checkout = LocalCheckout::new(&workdir);
        remediate(&checkout, &github, &openai, &config, &options).await
    } else {
        remediate(&github, &github, &openai, &config, &options).await
    }
}

async fn remediate<T: FileTreeSource>(
    tree: &T,
    github: &GitHubClient,
    openai: &OpenAiClient,
    config: &Config,
    options: &RunOptions,
) -> Result<RunSummary> {
    let bundle = assemble(tree, github, config.issue_number).await?;
    let summary = fix::run(openai, &bundle, &config.tuning, options).await?;
    if let Some(usage) = summary.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "token usage"
        );
    }
    Ok(summary)
}
