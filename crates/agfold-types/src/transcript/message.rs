use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolInput;

/// One entry of a session transcript.
///
/// `id` is assigned at creation and never reused inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl TranscriptMessage {
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn role(&self) -> Role {
        match self.body {
            MessageBody::User(_) => Role::User,
            MessageBody::Assistant(_) => Role::Assistant,
            MessageBody::ToolCall(_) => Role::ToolCall,
            MessageBody::System(_) => Role::System,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match &self.body {
            MessageBody::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_assistant_mut(&mut self) -> Option<&mut AssistantMessage> {
        match &mut self.body {
            MessageBody::Assistant(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallMessage> {
        match &self.body {
            MessageBody::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolCallMessage> {
        match &mut self.body {
            MessageBody::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.as_assistant().is_some_and(|msg| msg.is_streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MessageBody {
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolCall(ToolCallMessage),
    System(SystemMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub media_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default)]
    pub reasoning_finalized: bool,
}

impl AssistantMessage {
    pub fn streaming() -> Self {
        Self {
            is_streaming: true,
            ..Self::default()
        }
    }

    /// No visible text and no reasoning: nothing worth showing.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.reasoning.as_deref().is_none_or(str::is_empty)
    }

    pub fn has_open_reasoning(&self) -> bool {
        self.reasoning.is_some() && !self.reasoning_finalized
    }

    pub fn push_text(&mut self, delta: &str) {
        if self.has_open_reasoning() {
            self.reasoning_finalized = true;
        }
        self.text.push_str(delta);
    }

    pub fn push_reasoning(&mut self, delta: &str) {
        self.reasoning.get_or_insert_with(String::new).push_str(delta);
    }

    /// Close the message: reasoning becomes final and streaming stops.
    pub fn finish(&mut self) {
        if self.reasoning.is_some() {
            self.reasoning_finalized = true;
        }
        self.is_streaming = false;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallMessage {
    /// Correlation id linking this call to its result
    pub call_id: String,
    pub tool_name: String,
    pub input: ToolInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Present only for nested-agent tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent: Option<SubagentRun>,
}

impl ToolCallMessage {
    pub fn new(call_id: String, tool_name: String, input: ToolInput) -> Self {
        let subagent = input.is_nested_agent().then(SubagentRun::default);
        Self {
            call_id,
            tool_name,
            input,
            result: None,
            is_error: None,
            subagent,
        }
    }

    /// Still waiting for a result: no result and no error flag.
    pub fn is_pending(&self) -> bool {
        self.result.is_none() && self.is_error.is_none()
    }

    pub fn is_nested_agent(&self) -> bool {
        self.subagent.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
}

impl ToolResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Nested agent activity hosted by a `tool_call` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubagentRun {
    pub steps: Vec<SubagentStep>,
    pub status: SubagentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubagentStatus {
    #[default]
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubagentStep {
    pub call_id: String,
    pub tool_name: String,
    pub input: ToolInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
}
