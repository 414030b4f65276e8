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

//! JSON configuration for palaver.
//!
//! The file is optional. Every top-level section has a default, so a
//! partial file is merged shallowly over `{models: [], agents: [], proxy: null}`.

mod credentials;
mod error;
mod schema;

pub use credentials::{resolve_credential, resolve_credential_with};
pub use error::{ConfigError, Result};
pub use schema::{AgentConfig, Config, ModelConfig, ProxyAuth, ProxyConfig};
