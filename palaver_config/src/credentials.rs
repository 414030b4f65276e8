use crate::error::{ConfigError, Result};

/// Resolve a credential from config, falling back to the process environment.
pub fn resolve_credential(
    model: &str,
    field: &str,
    explicit: Option<&str>,
    env: &str,
) -> Result<String> {
    resolve_credential_with(model, field, explicit, env, |name| std::env::var(name).ok())
}

/// Same as [`resolve_credential`] with an injectable environment lookup.
///
/// Empty strings count as absent on both sides.
pub fn resolve_credential_with(
    model: &str,
    field: &str,
    explicit: Option<&str>,
    env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }
    lookup(env)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingCredential {
            model: model.to_string(),
            field: field.to_string(),
            env: env.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(value: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |_| value.map(ToString::to_string)
    }

    #[test]
    fn explicit_value_wins() {
        let key = resolve_credential_with("m1", "apiKey", Some("k"), "X", env_with(Some("env")));
        assert_eq!(key.ok().as_deref(), Some("k"));
    }

    #[test]
    fn falls_back_to_environment() {
        let key = resolve_credential_with("m1", "apiKey", Some(""), "X", env_with(Some("env")));
        assert_eq!(key.ok().as_deref(), Some("env"));
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        let err = resolve_credential_with("m1", "apiKey", None, "OPENAI_API_KEY", env_with(None));
        match err {
            Err(ConfigError::MissingCredential { model, env, .. }) => {
                assert_eq!(model, "m1");
                assert_eq!(env, "OPENAI_API_KEY");
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }
}
