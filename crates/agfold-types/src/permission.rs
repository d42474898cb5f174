use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::Protocol;
use crate::tool::ToolInput;

/// Protocol-agnostic view of a tool permission prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub tool_name: String,
    pub input: ToolInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub options: Vec<PermissionOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionOption {
    pub id: String,
    pub label: String,
    pub kind: PermissionOptionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
    AllowOnce,
    AllowAlways,
    RejectOnce,
    RejectAlways,
}

impl PermissionOptionKind {
    pub fn is_allow(self) -> bool {
        matches!(
            self,
            PermissionOptionKind::AllowOnce | PermissionOptionKind::AllowAlways
        )
    }
}

/// The request exactly as the agent sent it.
///
/// Answering needs protocol-specific fields (JSON-RPC ids, suggestion
/// payloads) that the normalized request drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPermission {
    pub protocol: Protocol,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPermission {
    pub request: PermissionRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawPermission>,
}
