// Agent Client Protocol: JSON-RPC `session/update` notifications carrying
// incremental chunks, plus permission requests and prompt responses.

pub mod normalize;
pub mod permission;
pub mod schema;
pub mod tools;

pub use normalize::{complete_turn_ops, normalize_update};
pub use permission::normalize_permission_request;
pub use schema::{PermissionRpcRequest, SessionNotification, SessionUpdate};
pub use tools::{derive_tool_name, tool_output};

use serde_json::Value;

use crate::{Error, Result};

/// One ACP line, classified.
#[derive(Debug, Clone)]
pub enum AcpMessage {
    Update(SessionNotification),
    PermissionRequest(PermissionRpcRequest),
    /// Response to `session/prompt`: the turn is over
    TurnComplete { stop_reason: Option<String> },
    /// Any other request or response (fs/terminal calls, initialize, ...)
    Other,
}

/// Parse one ACP line.
///
/// Accepts full JSON-RPC messages, bare `session/update` params and bare
/// update objects.
pub fn parse_message(line: &str) -> Result<AcpMessage> {
    let value: Value = serde_json::from_str(line.trim())?;
    let Value::Object(obj) = &value else {
        return Err(Error::Parse("ACP message is not a JSON object".to_string()));
    };

    if let Some(method) = obj.get("method").and_then(Value::as_str) {
        return match method {
            schema::SESSION_UPDATE => {
                let params = obj.get("params").cloned().unwrap_or(Value::Null);
                Ok(AcpMessage::Update(serde_json::from_value(params)?))
            }
            schema::REQUEST_PERMISSION => {
                Ok(AcpMessage::PermissionRequest(serde_json::from_value(value.clone())?))
            }
            _ => Ok(AcpMessage::Other),
        };
    }

    if let Some(result) = obj.get("result") {
        return Ok(match result.get("stopReason") {
            Some(reason) => AcpMessage::TurnComplete {
                stop_reason: reason.as_str().map(str::to_string),
            },
            None => AcpMessage::Other,
        });
    }

    if obj.contains_key("update") {
        return Ok(AcpMessage::Update(serde_json::from_value(value)?));
    }

    if obj.contains_key("sessionUpdate") {
        return Ok(AcpMessage::Update(SessionNotification {
            session_id: None,
            update: serde_json::from_value(value)?,
        }));
    }

    if obj.contains_key("error") {
        return Ok(AcpMessage::Other);
    }

    Err(Error::Parse("unrecognized ACP message".to_string()))
}
