use std::collections::HashMap;

use agfold_types::{
    AssistantMessage, MessageBody, PendingPermission, SessionInfo, SubagentStatus,
    ToolCallMessage, TranscriptMessage,
};
use serde::{Deserialize, Serialize};

/// Accumulated state of one agent session.
///
/// `Clone` is a deep copy; a clone never shares data with the live record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub messages: Vec<TranscriptMessage>,
    pub is_processing: bool,
    pub is_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_info: Option<SessionInfo>,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_permission: Option<PendingPermission>,

    /// Nested-agent call id -> host message id
    #[serde(skip)]
    pub(crate) parent_map: HashMap<String, String>,
    /// Message currently receiving deltas
    #[serde(skip)]
    pub(crate) streaming_id: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the message that receives the next streamed delta
    pub fn streaming_message_id(&self) -> Option<&str> {
        self.streaming_id.as_deref()
    }

    /// Host message id registered for a nested-agent call id
    pub fn host_message_id(&self, parent_call_id: &str) -> Option<&str> {
        self.parent_map.get(parent_call_id).map(String::as_str)
    }

    pub fn message(&self, id: &str) -> Option<&TranscriptMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn tool_call(&self, call_id: &str) -> Option<&ToolCallMessage> {
        self.messages
            .iter()
            .filter_map(TranscriptMessage::as_tool_call)
            .find(|call| call.call_id == call_id)
    }

    pub(crate) fn tool_call_mut(&mut self, call_id: &str) -> Option<&mut ToolCallMessage> {
        self.messages
            .iter_mut()
            .filter_map(TranscriptMessage::as_tool_call_mut)
            .find(|call| call.call_id == call_id)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub(crate) fn current_assistant_mut(&mut self) -> Option<&mut AssistantMessage> {
        let id = self.streaming_id.as_deref()?;
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .and_then(TranscriptMessage::as_assistant_mut)
    }

    /// Run `f` on the current streaming assistant message, creating one if needed
    pub(crate) fn with_streaming_assistant(&mut self, f: impl FnOnce(&mut AssistantMessage)) {
        let current = self
            .streaming_id
            .as_deref()
            .and_then(|id| self.position(id))
            .filter(|&index| self.messages[index].as_assistant().is_some());

        let index = match current {
            Some(index) => index,
            None => {
                let message =
                    TranscriptMessage::new(MessageBody::Assistant(AssistantMessage::streaming()));
                self.streaming_id = Some(message.id.clone());
                self.messages.push(message);
                self.messages.len() - 1
            }
        };

        if let Some(assistant) = self.messages[index].as_assistant_mut() {
            f(assistant);
        }
    }

    /// Rebuild bookkeeping that is not part of the serialized transcript.
    ///
    /// A pointer that still names an assistant message is kept, since a
    /// message ended by `message_delta` still awaits its finalized text.
    /// Otherwise the last streaming assistant message becomes current. Any
    /// other streaming message is frozen so at most one message streams.
    pub(crate) fn rebuild_index(&mut self) {
        self.parent_map = self
            .messages
            .iter()
            .filter_map(|m| {
                let call = m.as_tool_call()?;
                let run = call.subagent.as_ref()?;
                (run.status == SubagentStatus::Running).then(|| (call.call_id.clone(), m.id.clone()))
            })
            .collect();

        let pointer_is_live = self
            .streaming_id
            .as_deref()
            .and_then(|id| self.message(id))
            .is_some_and(|m| m.as_assistant().is_some());
        if !pointer_is_live {
            self.streaming_id = self
                .messages
                .iter()
                .rev()
                .find(|m| m.is_streaming())
                .map(|m| m.id.clone());
        }

        let current = self.streaming_id.clone();
        for message in &mut self.messages {
            if Some(message.id.as_str()) != current.as_deref()
                && let Some(assistant) = message.as_assistant_mut()
                && assistant.is_streaming
            {
                assistant.finish();
            }
        }
    }

    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_streaming()).count()
    }
}
