//! Server-Sent Events handling for streaming completions.

use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

/// Payload the server sends after the last chunk.
pub const DONE: &str = "[DONE]";

/// Feed every event payload of the response body to `on_data`, stopping at
/// the `[DONE]` marker.
pub async fn for_each_data(
    response: reqwest::Response,
    on_data: impl FnMut(&str) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    for_each_event(response.bytes_stream(), on_data).await
}

async fn for_each_event<S, B, E>(
    body: S,
    mut on_data: impl FnMut(&str) -> anyhow::Result<()>,
) -> anyhow::Result<()>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut events = std::pin::pin!(body.eventsource());
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| anyhow::anyhow!("SSE stream error: {e}"))?;
        if event.data == DONE {
            break;
        }
        on_data(&event.data)?;
    }
    Ok(())
}
