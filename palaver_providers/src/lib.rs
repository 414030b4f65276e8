#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Chat completion clients for the supported providers.
//!
//! Every client implements [`palaver_core::ChatModel`], so sessions never
//! need to know which service they talk to.

pub mod anthropic;
pub mod http;
mod kind;
pub mod openai;
pub mod palm;
mod sse;
mod util;
pub mod vertexai;
pub mod wenxin;

use std::sync::Arc;

use palaver_config::ModelConfig;
use palaver_core::ChatModel;

pub use anthropic::AnthropicProvider;
pub use kind::{ProviderKind, UnknownProviderKind};
pub use openai::OpenAIProvider;
pub use palm::PalmProvider;
pub use vertexai::VertexAIProvider;
pub use wenxin::WenxinProvider;

/// Construct the client for one configured model.
///
/// Missing credentials and malformed provider sections are configuration
/// errors.
pub fn build_provider(
    kind: ProviderKind,
    config: &ModelConfig,
    client: reqwest::Client,
) -> palaver_config::Result<Arc<dyn ChatModel>> {
    let provider: Arc<dyn ChatModel> = match kind {
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::from_config(config, client)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(config, client)?),
        ProviderKind::Palm => Arc::new(PalmProvider::from_config(config, client)?),
        ProviderKind::VertexAI => Arc::new(VertexAIProvider::from_config(config, client)?),
        ProviderKind::BaiduWenxin => Arc::new(WenxinProvider::from_config(config, client)?),
    };
    Ok(provider)
}
