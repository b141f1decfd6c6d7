//! Error types for MCP operations.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::protocol::OutboundMessage;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The event stream could not be opened.
    #[error("failed to initiate connection: {0}")]
    ConnectionInit(#[source] ConnectError),

    /// Posting one of the outbound protocol messages failed.
    #[error("failed to send {step}: {source}")]
    HandshakeSend {
        /// Which message failed to send.
        step: OutboundMessage,
        /// Underlying HTTP failure.
        #[source]
        source: reqwest::Error,
    },

    /// The caller's deadline elapsed (or its token was cancelled).
    #[error("context deadline exceeded while {phase}{}", closed_suffix(.stream_closed))]
    DeadlineExceeded {
        /// What the fetch was doing when it gave up.
        phase: FetchPhase,
        /// Whether the background stream reader had already stopped.
        stream_closed: bool,
    },

    /// The tools/list result could not be decoded.
    #[error("failed to parse tools response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The base URL or a derived URL is invalid.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The client has been closed.
    #[error("client is closed")]
    Closed,

    /// A message was sent before the server announced its messages endpoint.
    #[error("messages endpoint not yet discovered")]
    NoEndpoint,

    /// The client already owns an event stream.
    #[error("event stream already open - a client carries a single session")]
    AlreadyConnected,
}

/// Reasons the initial `GET /sse` can fail.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The request itself failed (DNS, refused, TLS, ...).
    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with something other than 200.
    #[error("unexpected status code: {0}")]
    Status(StatusCode),

    /// The server did not answer with an event stream.
    #[error("unexpected content type: {0}, expected text/event-stream")]
    ContentType(String),
}

/// The stage of a fetch, used to report where a deadline hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Opening the event stream.
    Connecting,
    /// Waiting for the server to announce its messages endpoint.
    AwaitingEndpoint,
    /// Posting an outbound message.
    Sending(OutboundMessage),
    /// Waiting for the tools/list result on the event stream.
    AwaitingResult,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::AwaitingEndpoint => f.write_str("awaiting messages endpoint"),
            Self::Sending(step) => write!(f, "sending {step}"),
            Self::AwaitingResult => f.write_str("awaiting tools response"),
        }
    }
}

impl McpError {
    /// Create a deadline error for the given phase.
    pub fn deadline(phase: FetchPhase, stream_closed: bool) -> Self {
        Self::DeadlineExceeded {
            phase,
            stream_closed,
        }
    }

    /// Check if the caller's deadline caused this error.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Check if the event stream could not be opened.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionInit(_))
    }

    /// The outbound message that failed to send, if any.
    pub fn handshake_step(&self) -> Option<OutboundMessage> {
        match self {
            Self::HandshakeSend { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn closed_suffix(stream_closed: &bool) -> &'static str {
    if *stream_closed {
        " (event stream closed)"
    } else {
        ""
    }
}

impl From<ConnectError> for McpError {
    fn from(err: ConnectError) -> Self {
        Self::ConnectionInit(err)
    }
}
