//! MCP (Model Context Protocol) SSE client for tool discovery.
//!
//! This crate connects to an MCP server over server-sent events, performs the
//! initialize handshake and asks the server which tools it exposes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  fetch_tools_response                                       │
//! │  - opens the stream, awaits the endpoint                    │
//! │  - POSTs initialize, initialized, tools/list                │
//! │  - waits for the tools result under one cancellation token  │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - GET {base}/sse, POST {base}/{endpoint}                   │
//! │  - owns the background stream task                          │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  background task: sse_messages → route_messages             │
//! │  - SSE framing (data lines, comments, blank-line ends)      │
//! │  - session messages → SessionNegotiator                     │
//! │  - tools results → tools channel                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use toolscan_mcp::{ClientConfig, McpClient, deadline_token, fetch_tools_response, parse_tools_response};
//!
//! # async fn example() -> toolscan_mcp::Result<()> {
//! let client = McpClient::new(ClientConfig::new("http://localhost:8080"))?;
//! let ctx = deadline_token(Duration::from_secs(5));
//!
//! let raw = fetch_tools_response(&ctx, &client).await?;
//! for tool in parse_tools_response(&raw)? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod fetch;
pub mod protocol;
pub mod router;
pub mod session;
pub mod sse;

// Re-export main types
pub use client::{ClientConfig, McpClient, SessionChannels};
pub use error::{ConnectError, FetchPhase, McpError, Result};
pub use fetch::{deadline_token, fetch_tools, fetch_tools_response};
pub use protocol::{
    DEFAULT_CLIENT_NAME, DEFAULT_DESCRIPTION, ListToolsResult, MCP_PROTOCOL_VERSION,
    OutboundMessage, Tool, ToolInfo, parse_tool_infos, parse_tools_response,
};
pub use router::{Inbound, RouterExit, classify};
pub use session::{SessionNegotiator, parse_messages_endpoint};
pub use sse::{SseDecoder, sse_messages};
