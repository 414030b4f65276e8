//! Process-wide HTTP client shared by all provider calls.
//!
//! [`apply`] runs once at startup with the configured proxy. Providers take
//! a clone of [`shared_client`] at construction time, so it must run before
//! the model registry is built.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::Context;
use once_cell::sync::Lazy;
use palaver_config::ProxyConfig;
use reqwest::{Client, Proxy};
use tracing::info;

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static SHARED_CLIENT: Lazy<RwLock<Client>> = Lazy::new(|| {
    RwLock::new(
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new()),
    )
});

fn apply_proxy_auth(proxy: Proxy, config: &ProxyConfig) -> Proxy {
    match &config.auth {
        Some(auth) if !auth.username.is_empty() => proxy.basic_auth(&auth.username, &auth.password),
        _ => proxy,
    }
}

/// Build a client with the fixed timeout and, if configured, a proxy.
pub fn build_client(proxy: Option<&ProxyConfig>) -> anyhow::Result<Client> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
    if let Some((config, url)) = proxy.and_then(|c| c.url().map(|url| (c, url))) {
        let proxy = Proxy::all(&url).with_context(|| format!("Invalid proxy URL: {url}"))?;
        builder = builder.proxy(apply_proxy_auth(proxy, config));
        info!("Using HTTP proxy {url}");
    }
    builder.build().context("Failed to build HTTP client")
}

/// Replace the shared client. Calling it again replaces the previous
/// settings.
pub fn apply(proxy: Option<&ProxyConfig>) -> anyhow::Result<()> {
    let client = build_client(proxy)?;
    let mut shared = SHARED_CLIENT
        .write()
        .map_err(|_| anyhow::anyhow!("Shared HTTP client lock poisoned"))?;
    *shared = client;
    Ok(())
}

/// Clone of the current shared client.
#[must_use]
pub fn shared_client() -> Client {
    match SHARED_CLIENT.read() {
        Ok(client) => client.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
