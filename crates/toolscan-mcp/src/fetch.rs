//! Tool discovery: handshake and tools/list over an SSE session.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{McpClient, SessionChannels};
use crate::error::{FetchPhase, McpError, Result};
use crate::protocol::{OutboundMessage, Tool, parse_tools_response};

/// A token that cancels itself after `timeout`.
///
/// The timer runs on a spawned task that lives until the token is cancelled,
/// either by the timeout or by the caller. Cancel the token once the fetch is
/// done to release it early.
///
/// Must be called from within a Tokio runtime.
pub fn deadline_token(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => {}
            _ = tokio::time::sleep(timeout) => timer.cancel(),
        }
    });
    token
}

/// Fetch the raw tools/list response from the server behind `client`.
///
/// Opens the event stream, waits for the messages endpoint, sends
/// `initialize`, `notifications/initialized` and `tools/list` in that order,
/// then returns the first tools result read from the stream. Everything runs
/// under `ctx`; when it fires the fetch fails with
/// [`McpError::DeadlineExceeded`].
///
/// The background reader has stopped by the time this returns.
pub async fn fetch_tools_response(ctx: &CancellationToken, client: &McpClient) -> Result<String> {
    let result = run_fetch(ctx, client).await;
    client.stop_stream().await;
    result
}

/// [`fetch_tools_response`] followed by [`parse_tools_response`].
pub async fn fetch_tools(ctx: &CancellationToken, client: &McpClient) -> Result<Vec<Tool>> {
    let raw = fetch_tools_response(ctx, client).await?;
    parse_tools_response(&raw)
}

async fn run_fetch(ctx: &CancellationToken, client: &McpClient) -> Result<String> {
    let SessionChannels {
        endpoint,
        mut tools,
    } = client.initiate_connection(ctx).await?;

    let endpoint = tokio::select! {
        biased;
        _ = ctx.cancelled() => return Err(McpError::deadline(FetchPhase::AwaitingEndpoint, false)),
        found = endpoint => match found {
            Ok(endpoint) => endpoint,
            Err(_) => return Err(stream_gone(ctx, client, FetchPhase::AwaitingEndpoint).await),
        },
    };

    tracing::info!(endpoint = %endpoint, "got messages endpoint");

    for step in OutboundMessage::SEQUENCE {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(McpError::deadline(FetchPhase::Sending(step), false)),
            sent = client.send_message(step) => sent?,
        }
    }

    loop {
        let message = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(McpError::deadline(FetchPhase::AwaitingResult, false)),
            message = tools.recv() => message,
        };

        match message {
            Some(message) if message.is_empty() => {
                tracing::warn!("empty tools response received");
            }
            Some(message) => return Ok(message),
            None => return Err(stream_gone(ctx, client, FetchPhase::AwaitingResult).await),
        }
    }
}

/// The reader stopped before delivering what we wait for. No more messages
/// will come; wait out the deadline unless the client was closed.
async fn stream_gone(ctx: &CancellationToken, client: &McpClient, phase: FetchPhase) -> McpError {
    if client.is_closed() {
        return McpError::Closed;
    }

    tracing::debug!(%phase, "event stream closed, waiting for deadline");
    ctx.cancelled().await;
    McpError::deadline(phase, true)
}
