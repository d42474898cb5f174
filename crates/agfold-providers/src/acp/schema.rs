use agfold_types::PermissionOptionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SESSION_UPDATE: &str = "session/update";
pub const REQUEST_PERMISSION: &str = "session/request_permission";

/// Params of a `session/update` notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionNotification {
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub update: SessionUpdate,
}

/// One incremental session update, tagged by `sessionUpdate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "sessionUpdate")]
#[serde(rename_all = "snake_case")]
pub enum SessionUpdate {
    UserMessageChunk(ContentChunk),
    AgentMessageChunk(ContentChunk),
    AgentThoughtChunk(ContentChunk),
    ToolCall(ToolCallFields),
    ToolCallUpdate(ToolCallFields),
    UsageUpdate(UsageUpdate),
    /// plan, available_commands_update, current_mode_update, ...
    #[serde(other)]
    Unknown,
}

impl SessionUpdate {
    pub fn meta(&self) -> Option<&Value> {
        match self {
            SessionUpdate::UserMessageChunk(chunk)
            | SessionUpdate::AgentMessageChunk(chunk)
            | SessionUpdate::AgentThoughtChunk(chunk) => chunk.meta.as_ref(),
            SessionUpdate::ToolCall(fields) | SessionUpdate::ToolCallUpdate(fields) => {
                fields.meta.as_ref()
            }
            SessionUpdate::UsageUpdate(_) | SessionUpdate::Unknown => None,
        }
    }

    /// Tool call of the parent agent that produced this update, if nested
    pub fn parent_tool_call_id(&self) -> Option<&str> {
        let meta = self.meta()?;
        meta.get("parentToolCallId")
            .or_else(|| meta.get("claudeCode")?.get("parentToolUseId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentChunk {
    pub content: ContentBlock,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ResourceLink {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// image, audio, embedded resource
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Fields shared by `tool_call` and `tool_call_update`.
///
/// An update only carries what changed, so everything but the id is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallFields {
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolCallStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ToolCallContent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ToolCallLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<Value>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ToolCallFields {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            Some(ToolCallStatus::Completed | ToolCallStatus::Failed)
        )
    }

    pub fn is_failed(&self) -> bool {
        self.status == Some(ToolCallStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ToolCallContent {
    Content {
        content: ContentBlock,
    },
    #[serde(rename_all = "camelCase")]
    Diff {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_text: Option<String>,
        #[serde(default)]
        new_text: String,
    },
    #[serde(rename_all = "camelCase")]
    Terminal {
        terminal_id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCallLocation {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UsageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cost {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// A `session/request_permission` JSON-RPC request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermissionRpcRequest {
    /// JSON-RPC id; the answer must echo it
    pub id: Value,
    pub params: PermissionParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub tool_call: ToolCallFields,
    #[serde(default)]
    pub options: Vec<PermissionOptionWire>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOptionWire {
    pub option_id: String,
    pub name: String,
    pub kind: PermissionOptionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call() {
        let update: SessionUpdate = serde_json::from_str(
            r#"{"sessionUpdate":"tool_call","toolCallId":"call_1","title":"Read src/lib.rs","kind":"read","status":"pending","locations":[{"path":"src/lib.rs","line":3}],"rawInput":{"file_path":"src/lib.rs"}}"#,
        )
        .unwrap();

        match update {
            SessionUpdate::ToolCall(fields) => {
                assert_eq!(fields.tool_call_id, "call_1");
                assert_eq!(fields.status, Some(ToolCallStatus::Pending));
                assert_eq!(fields.locations.as_ref().unwrap()[0].line, Some(3));
                assert!(!fields.is_terminal());
            }
            other => panic!("Expected tool_call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_update_kinds_are_tolerated() {
        let update: SessionUpdate = serde_json::from_str(
            r#"{"sessionUpdate":"plan","entries":[{"content":"x","priority":"high","status":"pending"}]}"#,
        )
        .unwrap();
        assert!(matches!(update, SessionUpdate::Unknown));

        let fields: ToolCallFields =
            serde_json::from_str(r#"{"toolCallId":"c","status":"cancelled"}"#).unwrap();
        assert_eq!(fields.status, Some(ToolCallStatus::Unknown));
    }

    #[test]
    fn test_parent_tool_call_id_from_meta() {
        let update: SessionUpdate = serde_json::from_str(
            r#"{"sessionUpdate":"tool_call_update","toolCallId":"c2","_meta":{"claudeCode":{"parentToolUseId":"task_1"}}}"#,
        )
        .unwrap();
        assert_eq!(update.parent_tool_call_id(), Some("task_1"));

        let update: SessionUpdate = serde_json::from_str(
            r#"{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"hi"},"_meta":{"parentToolCallId":"task_2"}}"#,
        )
        .unwrap();
        assert_eq!(update.parent_tool_call_id(), Some("task_2"));

        let update: SessionUpdate = serde_json::from_str(
            r#"{"sessionUpdate":"usage_update","cost":{"amount":0.02,"currency":"USD"}}"#,
        )
        .unwrap();
        assert_eq!(update.parent_tool_call_id(), None);
    }
}
