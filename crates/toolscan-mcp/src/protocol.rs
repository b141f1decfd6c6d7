//! Wire payloads and the tools/list response parser.
//!
//! The three outbound messages are fixed literals. Servers in the wild compare
//! them byte for byte, so they are written out by hand rather than serialized
//! (serde_json would reorder the keys).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// MCP protocol version sent in the initialize request.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name announced in `clientInfo` unless configured otherwise.
pub const DEFAULT_CLIENT_NAME: &str = "cursor-vscode";

/// Description substituted for tools that do not provide one.
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// The `notifications/initialized` notification.
pub const INITIALIZED_NOTIFICATION: &str =
    r#"{"method":"notifications/initialized","jsonrpc":"2.0"}"#;

/// The `tools/list` request.
pub const LIST_TOOLS_REQUEST: &str = r#"{"method":"tools/list","jsonrpc":"2.0","id":1}"#;

/// Build the `initialize` request announcing `client_name`.
pub fn initialize_request(client_name: &str) -> String {
    // to_string on a &str only fails for non-string map keys
    let name = serde_json::to_string(client_name).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        concat!(
            r#"{{"method":"initialize","params":{{"protocolVersion":"{version}","#,
            r#""capabilities":{{"tools":true,"prompts":false,"resources":true,"logging":false,"roots":{{"listChanged":false}}}},"#,
            r#""clientInfo":{{"name":{name},"version":"1.0.0"}}}},"jsonrpc":"2.0","id":0}}"#
        ),
        version = MCP_PROTOCOL_VERSION,
        name = name,
    )
}

/// The outbound messages of a fetch, in the order they must be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundMessage {
    /// `initialize` request declaring capabilities and protocol version.
    Initialize,
    /// `notifications/initialized`.
    Initialized,
    /// `tools/list` request.
    ListTools,
}

impl OutboundMessage {
    /// Handshake followed by the list request.
    pub const SEQUENCE: [OutboundMessage; 3] = [Self::Initialize, Self::Initialized, Self::ListTools];

    /// The JSON body for this message.
    pub fn body(&self, client_name: &str) -> String {
        match self {
            Self::Initialize => initialize_request(client_name),
            Self::Initialized => INITIALIZED_NOTIFICATION.to_string(),
            Self::ListTools => LIST_TOOLS_REQUEST.to_string(),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "initialize",
            Self::Initialized => "initialized",
            Self::ListTools => "list_tools",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tools/list result
// ─────────────────────────────────────────────────────────────────────────────

/// A tool definition as the server sent it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters. Not interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// The `result` object of a tools/list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// List of available tools.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Deserialize)]
struct ToolsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    result: ListToolsResult,
}

/// An explicit `null` decodes the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A discovered tool, normalized for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name.
    pub name: String,
    /// Description, or [`DEFAULT_DESCRIPTION`] when the server gave none.
    pub description: String,
}

impl From<ToolInfo> for Tool {
    fn from(info: ToolInfo) -> Self {
        let description = info
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        Self {
            name: info.name,
            description,
        }
    }
}

/// Decode a raw tools/list response into the server's tool records.
///
/// Input schemas are preserved as opaque JSON.
pub fn parse_tool_infos(raw: &str) -> Result<Vec<ToolInfo>> {
    let response: ToolsResponse = serde_json::from_str(raw)?;
    Ok(response.result.tools)
}

/// Decode a raw tools/list response into normalized [`Tool`]s, in server order.
pub fn parse_tools_response(raw: &str) -> Result<Vec<Tool>> {
    let tools: Vec<Tool> = parse_tool_infos(raw)?
        .into_iter()
        .map(Tool::from)
        .collect();

    tracing::debug!(tool_count = tools.len(), "parsed tools response");

    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;

    #[test]
    fn test_initialize_request_literal() {
        assert_eq!(
            initialize_request("cursor-vscode"),
            r#"{"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{"tools":true,"prompts":false,"resources":true,"logging":false,"roots":{"listChanged":false}},"clientInfo":{"name":"cursor-vscode","version":"1.0.0"}},"jsonrpc":"2.0","id":0}"#
        );
    }

    #[test]
    fn test_initialize_request_escapes_name() {
        let body = initialize_request(r#"odd "name""#);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["params"]["clientInfo"]["name"], r#"odd "name""#);
    }

    #[test]
    fn test_outbound_bodies_are_valid_json() {
        for message in OutboundMessage::SEQUENCE {
            let body = message.body(DEFAULT_CLIENT_NAME);
            let value: Value = serde_json::from_str(&body).unwrap();
            assert_eq!(value["jsonrpc"], "2.0");
        }
        assert_eq!(
            OutboundMessage::Initialized.body("x"),
            r#"{"method":"notifications/initialized","jsonrpc":"2.0"}"#
        );
        assert_eq!(
            OutboundMessage::ListTools.body("x"),
            r#"{"method":"tools/list","jsonrpc":"2.0","id":1}"#
        );
    }

    #[test]
    fn test_parse_tools_default_description() {
        let raw = r#"{"result":{"tools":[{"name":"a"},{"name":"b","description":"d"}]}}"#;
        let tools = parse_tools_response(raw).unwrap();
        assert_eq!(
            tools,
            vec![
                Tool {
                    name: "a".into(),
                    description: "No description provided".into()
                },
                Tool {
                    name: "b".into(),
                    description: "d".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_tools_empty_description() {
        let raw = r#"{"result":{"tools":[{"name":"a","description":""}]}}"#;
        let tools = parse_tools_response(raw).unwrap();
        assert_eq!(tools[0].description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_parse_tools_empty_list() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#;
        assert!(parse_tools_response(raw).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tools_null_is_empty() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":null}}"#;
        assert!(parse_tools_response(raw).unwrap().is_empty());

        let raw = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        assert!(parse_tools_response(raw).unwrap().is_empty());

        let raw = r#"{"jsonrpc":"2.0","id":1}"#;
        assert!(parse_tool_infos(raw).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tools_preserves_schema() {
        let raw = r#"{"result":{"tools":[{"name":"read","inputSchema":{"type":"object","required":["path"]}}]}}"#;
        let infos = parse_tool_infos(raw).unwrap();
        assert_eq!(infos.len(), 1);
        let schema = infos[0].input_schema.as_ref().unwrap();
        assert_eq!(schema["required"][0], "path");
    }

    #[test]
    fn test_parse_tools_invalid_json() {
        assert!(matches!(parse_tools_response(""), Err(McpError::Decode(_))));
        assert!(matches!(
            parse_tools_response("data: not json"),
            Err(McpError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_tools_missing_name() {
        let raw = r#"{"result":{"tools":[{"description":"nameless"}]}}"#;
        assert!(matches!(parse_tools_response(raw), Err(McpError::Decode(_))));
    }

    #[test]
    fn test_step_names() {
        assert_eq!(OutboundMessage::Initialize.to_string(), "initialize");
        assert_eq!(OutboundMessage::Initialized.to_string(), "initialized");
        assert_eq!(OutboundMessage::ListTools.to_string(), "list_tools");
    }
}
