//! MCP client for a single SSE session.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ConnectError, FetchPhase, McpError, Result};
use crate::protocol::{DEFAULT_CLIENT_NAME, OutboundMessage};
use crate::router::{RouterExit, route_messages};
use crate::session::SessionNegotiator;
use crate::sse::sse_messages;

/// Content type an SSE endpoint must answer with.
const EVENT_STREAM: &str = "text/event-stream";

/// Configuration for an MCP SSE client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the MCP server, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Name announced in the initialize request's `clientInfo`.
    pub client_name: String,
    /// Timeout for each outbound POST. The event stream itself is bounded only
    /// by the caller's cancellation token.
    pub request_timeout: Duration,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            request_timeout: Duration::from_secs(10),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Receivers handed to the fetch when the stream opens.
#[derive(Debug)]
pub struct SessionChannels {
    /// Resolves with the messages endpoint once the server announces it.
    pub endpoint: oneshot::Receiver<String>,
    /// tools/list results read from the stream.
    pub tools: mpsc::Receiver<String>,
}

struct StreamTask {
    cancel: CancellationToken,
    handle: JoinHandle<RouterExit>,
}

#[derive(Default)]
struct ClientState {
    closed: bool,
    connected: bool,
    stream: Option<StreamTask>,
}

/// An MCP client bound to one server and one session.
///
/// The messages endpoint is discovered once and kept for the lifetime of the
/// client.
pub struct McpClient {
    config: ClientConfig,
    base_url: String,
    http: reqwest::Client,
    endpoint: Arc<OnceLock<String>>,
    state: Mutex<ClientState>,
}

impl McpClient {
    /// Create a client. No connection is made until
    /// [`initiate_connection`](Self::initiate_connection).
    pub fn new(config: ClientConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let http = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(McpError::Client)?;

        tracing::debug!(url = %base_url, "created MCP client");

        Ok(Self {
            config,
            base_url,
            http,
            endpoint: Arc::new(OnceLock::new()),
            state: Mutex::new(ClientState::default()),
        })
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The messages endpoint, once the server has announced it.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.get().map(String::as_str)
    }

    /// Check if [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.config
            .headers
            .iter()
            .fold(builder, |req, (key, value)| req.header(key, value))
    }

    /// Open the event stream and start the background reader.
    ///
    /// The reader runs until `ctx` is cancelled, the stream ends, or the
    /// client is closed.
    pub async fn initiate_connection(&self, ctx: &CancellationToken) -> Result<SessionChannels> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(McpError::Closed);
            }
            if state.connected {
                return Err(McpError::AlreadyConnected);
            }
            state.connected = true;
        }

        let url = format!("{}/sse", self.base_url);
        tracing::info!(url = %url, "initiating connection");

        let request = self
            .request(self.http.get(&url))
            .header(reqwest::header::ACCEPT, EVENT_STREAM)
            .send();

        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(McpError::deadline(FetchPhase::Connecting, false)),
            response = request => response.map_err(ConnectError::from)?,
        };

        if response.status() != StatusCode::OK {
            return Err(ConnectError::Status(response.status()).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains(EVENT_STREAM) {
            return Err(ConnectError::ContentType(content_type).into());
        }

        let (negotiator, endpoint_rx) = SessionNegotiator::new(self.endpoint.clone());
        let (tools_tx, tools_rx) = mpsc::channel(1);
        let cancel = ctx.child_token();

        // The reader is only spawned under the lock, so close() either sees
        // it in `stream` and joins it, or it is never started.
        let mut state = self.state.lock();
        if state.closed {
            tracing::debug!("client closed while connecting");
            return Err(McpError::Closed);
        }

        tracing::info!("processing SSE stream");
        let messages = sse_messages(response.bytes_stream());
        let handle = tokio::spawn(route_messages(messages, negotiator, tools_tx, cancel.clone()));
        state.stream = Some(StreamTask { cancel, handle });

        Ok(SessionChannels {
            endpoint: endpoint_rx,
            tools: tools_rx,
        })
    }

    /// POST a protocol message to the discovered messages endpoint.
    pub async fn send_message(&self, message: OutboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let endpoint = self.endpoint().ok_or(McpError::NoEndpoint)?;
        let url = format!("{}/{}", self.base_url, endpoint);

        tracing::debug!(url = %url, step = %message, "sending message");

        self.request(self.http.post(&url))
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.config.request_timeout)
            .body(message.body(&self.config.client_name))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| McpError::HandshakeSend {
                step: message,
                source,
            })?;

        Ok(())
    }

    /// Stop the background reader and wait for it to exit.
    ///
    /// Once this returns nothing will be delivered to the session channels.
    pub async fn stop_stream(&self) {
        let task = self.state.lock().stream.take();
        if let Some(task) = task {
            task.cancel.cancel();
            match task.handle.await {
                Ok(exit) => tracing::debug!(?exit, "event stream task finished"),
                Err(e) => tracing::warn!(error = %e, "event stream task failed"),
            }
        }
    }

    /// Close the client. Safe to call more than once; later calls do nothing.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        tracing::debug!(url = %self.base_url, "closing MCP client");
        self.stop_stream().await;
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().stream.take() {
            task.cancel.cancel();
        }
    }
}
