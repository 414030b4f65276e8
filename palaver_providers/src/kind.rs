use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized model type: {0:?}")]
pub struct UnknownProviderKind(pub String);

/// Model types accepted in the `type` field of a model config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Palm,
    VertexAI,
    BaiduWenxin,
}

impl ProviderKind {
    pub const ALL: [Self; 5] = [
        Self::OpenAI,
        Self::Anthropic,
        Self::Palm,
        Self::VertexAI,
        Self::BaiduWenxin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openAI",
            Self::Anthropic => "anthropic",
            Self::Palm => "palm",
            Self::VertexAI => "vertexai",
            Self::BaiduWenxin => "baiduWenxin",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProviderKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "palm" | "googlepalm" => Ok(Self::Palm),
            "vertexai" | "googlevertexai" => Ok(Self::VertexAI),
            "baiduwenxin" | "wenxin" => Ok(Self::BaiduWenxin),
            _ => Err(UnknownProviderKind(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_with_aliases() {
        assert_eq!("openAI".parse(), Ok(ProviderKind::OpenAI));
        assert_eq!("OPENAI".parse(), Ok(ProviderKind::OpenAI));
        assert_eq!("googlepalm".parse(), Ok(ProviderKind::Palm));
        assert_eq!("GoogleVertexAI".parse(), Ok(ProviderKind::VertexAI));
        assert_eq!("baiduWenxin".parse(), Ok(ProviderKind::BaiduWenxin));
    }

    #[test]
    fn canonical_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse(), Ok(kind));
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert_eq!(
            "unknown".parse::<ProviderKind>(),
            Err(UnknownProviderKind("unknown".to_string()))
        );
    }
}
