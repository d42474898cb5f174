use serde::{Deserialize, Serialize};

use crate::permission::PendingPermission;
use crate::session::SessionInfo;
use crate::tool::ToolInput;
use crate::transcript::{SubagentStep, ToolResult};

/// Protocol-agnostic transcript mutation.
///
/// Each protocol normalizer turns one wire event into an ordered list of
/// these; the engine applies them to the session record in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum TranscriptOp {
    /// Replace session info; the session is connected and processing.
    SessionStarted(SessionInfo),

    /// Open a fresh streaming assistant message and make it current.
    StartAssistant,

    /// Append visible text to the current streaming message (created on demand).
    AppendText(String),

    /// Append reasoning to the current streaming message (created on demand).
    AppendReasoning(String),

    /// End of message: drop the current message if empty, otherwise stop streaming it.
    EndMessage,

    /// Authoritative end marker: like `EndMessage`, then forget the current message.
    StopMessage,

    /// Authoritative text/reasoning for the turn's assistant message.
    ///
    /// `None` means the event carried no block of that kind.
    FinalizeAssistant {
        text: Option<String>,
        reasoning: Option<String>,
    },

    /// Append a `tool_call` message unless one with the same call id exists.
    OpenToolCall(ToolCallOpen),

    /// Attach (or overwrite) the result of a `tool_call` by call id.
    AttachToolResult {
        call_id: String,
        result: ToolResult,
        is_error: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subagent: Option<SubagentSummary>,
    },

    /// Give every still-pending `tool_call` an empty result.
    ClosePendingToolCalls,

    /// Add to the running session cost.
    AddCost(f64),

    /// Turn finished: processing stops, cost is added, errors become system lines.
    TurnEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    PermissionRequested(PendingPermission),

    PermissionCancelled { request_id: String },

    /// Activity of a nested agent, addressed to its host tool call.
    Nested {
        parent_call_id: String,
        op: NestedOp,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOpen {
    pub call_id: String,
    pub tool_name: String,
    pub input: ToolInput,
    /// Set when the call arrives already finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    #[serde(default)]
    pub is_error: bool,
}

/// Facts about a finished nested agent run, taken from its tool result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubagentSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NestedOp {
    AddSteps { steps: Vec<SubagentStep> },
    AttachStepResult { call_id: String, result: ToolResult },
}
