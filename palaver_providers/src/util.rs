use palaver_config::ConfigError;
use palaver_core::Role;

/// Validate a configured base URL and strip any trailing slash.
pub fn parse_base_url(model: &str, raw: &str) -> palaver_config::Result<String> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        model: model.to_string(),
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported".to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Turn a non-success HTTP response into an error carrying the body.
pub async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{provider} API error: HTTP {status}: {}", truncate(&body, 500))
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Conversation turns for APIs that only know two speakers.
///
/// System messages are dropped (callers send them out-of-band), tool output
/// is attributed to the user, and consecutive turns from the same speaker
/// are merged since these APIs reject non-alternating transcripts.
pub fn alternating_turns(messages: &[palaver_core::ChatMessage]) -> Vec<(Role, String)> {
    let mut turns: Vec<(Role, String)> = Vec::new();
    for message in messages {
        let role = match message.role {
            Role::System => continue,
            Role::User | Role::Tool => Role::User,
            Role::Assistant => Role::Assistant,
        };
        match turns.last_mut() {
            Some((last, content)) if *last == role => {
                content.push_str("\n\n");
                content.push_str(&message.content);
            }
            _ => turns.push((role, message.content.clone())),
        }
    }
    turns
}

/// Cut a completion at the first stop sequence, for APIs without native
/// stop support.
pub fn apply_stop(mut text: String, stop: &[String]) -> String {
    if let Some(idx) = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
    {
        text.truncate(idx);
    }
    text
}
