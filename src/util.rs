/// Cut `s` down to `max` characters, ending with `...` when anything was dropped.
pub fn truncate(s: &str, max: usize) -> String {
    const ELLIPSIS: &str = "...";

    if s.char_indices().nth(max).is_none() {
        return s.to_string();
    }
    if max <= ELLIPSIS.len() {
        return s.chars().take(max).collect();
    }

    let keep = s
        .char_indices()
        .nth(max - ELLIPSIS.len())
        .map_or(s.len(), |(idx, _)| idx);
    format!("{}{}", &s[..keep], ELLIPSIS)
}
