//! Message routing for the background stream task.
//!
//! Every message read from the event stream is classified once: a tools/list
//! result goes to the waiting fetch, a session message goes to the
//! [`SessionNegotiator`], and anything else is dropped.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde::de::IgnoredAny;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::{SESSION_MARKER, SessionNegotiator};

/// What a stream message turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A JSON-RPC response whose result carries a `tools` key.
    ToolsResult,
    /// A message mentioning the session.
    Session,
    /// Anything else (pings, unrelated notifications, ...).
    Other,
}

#[derive(Deserialize)]
struct ResultShape {
    #[serde(rename = "result")]
    _result: ToolsShape,
}

#[derive(Deserialize)]
struct ToolsShape {
    #[serde(rename = "tools")]
    _tools: IgnoredAny,
}

/// Classify a raw stream message.
///
/// The tools result shape is tried first since it is a strict decode; a tool
/// description that happens to mention a session must not be mistaken for
/// the endpoint announcement.
pub fn classify(message: &str) -> Inbound {
    if serde_json::from_str::<ResultShape>(message).is_ok() {
        Inbound::ToolsResult
    } else if message.contains(SESSION_MARKER) {
        Inbound::Session
    } else {
        Inbound::Other
    }
}

/// Why the background task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterExit {
    /// The cancellation token fired.
    Cancelled,
    /// The server closed the stream (or a read failed).
    StreamEnded,
    /// Nobody is waiting for tools results any more.
    ConsumerGone,
}

/// Drain `messages`, routing each one, until cancelled or the stream ends.
///
/// Cancellation is checked before every delivery so nothing is handed to the
/// tools channel once the token has fired.
pub async fn route_messages<S>(
    messages: S,
    mut negotiator: SessionNegotiator,
    tools_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> RouterExit
where
    S: Stream<Item = String>,
{
    tracing::debug!("waiting for messages");
    futures::pin_mut!(messages);

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RouterExit::Cancelled,
            next = messages.next() => match next {
                Some(message) => message,
                None => return RouterExit::StreamEnded,
            },
        };

        tracing::debug!(message = %message, "received message");

        match classify(&message) {
            Inbound::ToolsResult => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return RouterExit::Cancelled,
                    sent = tools_tx.send(message) => {
                        if sent.is_err() {
                            return RouterExit::ConsumerGone;
                        }
                    }
                }
            }
            Inbound::Session => {
                negotiator.observe(&message);
            }
            Inbound::Other => {}
        }
    }
}
