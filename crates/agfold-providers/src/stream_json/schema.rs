use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of a stream-json conversation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StreamJsonEvent {
    System(SystemEvent),
    StreamEvent(StreamEventEnvelope),
    Assistant(AssistantEvent),
    User(UserEvent),
    Result(ResultEvent),
    ControlRequest(ControlRequestEvent),
    ControlCancelRequest(ControlCancelEvent),
    #[serde(other)]
    Unknown,
}

impl StreamJsonEvent {
    /// Tool call that spawned this event, for events produced by a nested agent
    pub fn parent_tool_use_id(&self) -> Option<&str> {
        match self {
            StreamJsonEvent::StreamEvent(e) => e.parent_tool_use_id.as_deref(),
            StreamJsonEvent::Assistant(e) => e.parent_tool_use_id.as_deref(),
            StreamJsonEvent::User(e) => e.parent_tool_use_id.as_deref(),
            _ => None,
        }
    }

    /// Conversation this event belongs to, when the agent names one
    pub fn session_id(&self) -> Option<&str> {
        match self {
            StreamJsonEvent::System(e) => e.session_id.as_deref(),
            StreamJsonEvent::StreamEvent(e) => e.session_id.as_deref(),
            StreamJsonEvent::Assistant(e) => e.session_id.as_deref(),
            StreamJsonEvent::User(e) => e.session_id.as_deref(),
            StreamJsonEvent::Result(e) => e.session_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemEvent {
    pub subtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, alias = "claude_code_version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        default,
        rename = "permissionMode",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEventEnvelope {
    pub event: StreamDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Raw model streaming event forwarded inside `stream_event`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StreamDelta {
    MessageStart {
        #[serde(default)]
        message: Value,
    },
    ContentBlockStart {
        #[serde(default)]
        index: u32,
        #[serde(default)]
        content_block: Value,
    },
    ContentBlockDelta {
        #[serde(default)]
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        #[serde(default)]
        index: u32,
    },
    MessageDelta {
        #[serde(default)]
        delta: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Value>,
    },
    MessageStop,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
    SignatureDelta { signature: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantEvent {
    pub message: AssistantBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<AssistantContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum AssistantContent {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserEvent {
    pub message: UserBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Structured result of the tool this message answers
    #[serde(default, skip_serializing_if = "skip_empty_tool_use_result")]
    pub tool_use_result: Option<ToolUseResult>,
}

/// Nested agent run metadata carried next to a `Task` tool result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUseResult {
    pub status: Option<String>,
    /// Session id of the nested agent run
    pub agent_id: Option<String>,
    pub total_duration_ms: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl ToolUseResult {
    /// Check if all fields are None (considered "empty" for serialization skip)
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.agent_id.is_none()
            && self.total_duration_ms.is_none()
            && self.total_tokens.is_none()
    }
}

/// Skip serializing Option<ToolUseResult> if None or empty
fn skip_empty_tool_use_result(opt: &Option<ToolUseResult>) -> bool {
    match opt {
        None => true,
        Some(r) => r.is_empty(),
    }
}

impl<'de> serde::Deserialize<'de> for ToolUseResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, SeqAccess, Visitor};
        use std::fmt;

        struct ToolUseResultVisitor;

        impl<'de> Visitor<'de> for ToolUseResultVisitor {
            type Value = ToolUseResult;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map or any value for ToolUseResult")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut result = ToolUseResult::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "status" => result.status = map.next_value()?,
                        "agentId" => result.agent_id = map.next_value()?,
                        "totalDurationMs" => result.total_duration_ms = map.next_value()?,
                        "totalTokens" => result.total_tokens = map.next_value()?,
                        _ => {
                            let _ = map.next_value::<serde::de::IgnoredAny>()?;
                        }
                    }
                }
                Ok(result)
            }

            // Plain tools report strings (e.g., error messages) or arrays here
            fn visit_str<E>(self, _: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ToolUseResult::default())
            }

            fn visit_string<E>(self, _: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ToolUseResult::default())
            }

            fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
            where
                S: SeqAccess<'de>,
            {
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(ToolUseResult::default())
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ToolUseResult::default())
            }
        }

        deserializer.deserialize_any(ToolUseResultVisitor)
    }
}

impl serde::Serialize for ToolUseResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        if let Some(ref status) = self.status {
            map.serialize_entry("status", status)?;
        }
        if let Some(ref agent_id) = self.agent_id {
            map.serialize_entry("agentId", agent_id)?;
        }
        if let Some(ms) = self.total_duration_ms {
            map.serialize_entry("totalDurationMs", &ms)?;
        }
        if let Some(tokens) = self.total_tokens {
            map.serialize_entry("totalTokens", &tokens)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserBody {
    #[serde(default, deserialize_with = "deserialize_user_content")]
    pub content: Vec<UserContent>,
}

fn deserialize_user_content<'de, D>(deserializer: D) -> Result<Vec<UserContent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrArray {
        String(String),
        Array(Vec<UserContent>),
    }

    match StringOrArray::deserialize(deserializer)? {
        StringOrArray::String(s) => Ok(vec![UserContent::Text { text: s }]),
        StringOrArray::Array(arr) => Ok(arr),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum UserContent {
    Text {
        text: String,
    },
    Image {
        source: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultEvent {
    pub subtype: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ResultEvent {
    pub fn is_failure(&self) -> bool {
        self.is_error || self.subtype.starts_with("error")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlRequestEvent {
    pub request_id: String,
    pub request: ControlRequestBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlRequestBody {
    pub subtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_suggestions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlCancelEvent {
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_delta() {
        let event: StreamJsonEvent = serde_json::from_str(
            r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}},"session_id":"s1"}"#,
        )
        .unwrap();

        match event {
            StreamJsonEvent::StreamEvent(env) => match env.event {
                StreamDelta::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                    ..
                } => assert_eq!(text, "Hi"),
                other => panic!("Expected text delta, got {:?}", other),
            },
            other => panic!("Expected stream_event, got {:?}", other),
        }
    }

    #[test]
    fn test_session_id_accessor() {
        let event: StreamJsonEvent = serde_json::from_str(
            r#"{"type":"result","subtype":"success","session_id":"s9","total_cost_usd":0.1}"#,
        )
        .unwrap();
        assert_eq!(event.session_id(), Some("s9"));

        let event: StreamJsonEvent = serde_json::from_str(
            r#"{"type":"control_cancel_request","request_id":"r1"}"#,
        )
        .unwrap();
        assert_eq!(event.session_id(), None);
    }

    #[test]
    fn test_unknown_types_are_tolerated() {
        let event: StreamJsonEvent =
            serde_json::from_str(r#"{"type":"keep_alive","foo":1}"#).unwrap();
        assert!(matches!(event, StreamJsonEvent::Unknown));

        let event: StreamJsonEvent = serde_json::from_str(
            r#"{"type":"stream_event","event":{"type":"ping"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamJsonEvent::StreamEvent(StreamEventEnvelope {
                event: StreamDelta::Unknown,
                ..
            })
        ));
    }

    #[test]
    fn test_user_content_accepts_plain_string() {
        let event: StreamJsonEvent = serde_json::from_str(
            r#"{"type":"user","message":{"role":"user","content":"hello"}}"#,
        )
        .unwrap();

        match event {
            StreamJsonEvent::User(user) => {
                assert!(matches!(
                    user.message.content.as_slice(),
                    [UserContent::Text { text }] if text == "hello"
                ));
            }
            other => panic!("Expected user event, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_use_result_variants() {
        let event: UserEvent = serde_json::from_str(
            r#"{"message":{"content":[]},"tool_use_result":{"status":"completed","agentId":"a1","totalDurationMs":1200,"totalTokens":345,"content":[]}}"#,
        )
        .unwrap();
        let meta = event.tool_use_result.unwrap();
        assert_eq!(meta.agent_id.as_deref(), Some("a1"));
        assert_eq!(meta.total_duration_ms, Some(1200));
        assert_eq!(meta.total_tokens, Some(345));

        let event: UserEvent = serde_json::from_str(
            r#"{"message":{"content":[]},"tool_use_result":"Error: permission denied"}"#,
        )
        .unwrap();
        assert!(event.tool_use_result.unwrap().is_empty());
    }

    #[test]
    fn test_result_failure_detection() {
        let event: ResultEvent =
            serde_json::from_str(r#"{"subtype":"error_max_turns","is_error":false}"#).unwrap();
        assert!(event.is_failure());

        let event: ResultEvent =
            serde_json::from_str(r#"{"subtype":"success","total_cost_usd":0.1}"#).unwrap();
        assert!(!event.is_failure());
    }
}
