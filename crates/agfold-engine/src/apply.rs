use agfold_types::{
    AssistantMessage, MessageBody, PermissionRequest, SubagentStatus, SubagentSummary,
    SystemMessage, ToolCallMessage, ToolCallOpen, ToolResult, TranscriptMessage, TranscriptOp,
};

use crate::nesting;
use crate::state::SessionState;
use crate::tracker;

/// One notification owed to the host.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    Processing(bool),
    Permission(PermissionRequest),
}

/// Notifications produced while applying ops, delivered after the batch in
/// the order the ops produced them.
#[derive(Debug, Default)]
pub(crate) struct Effects(Vec<Effect>);

impl Effects {
    pub fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Effect> {
        self.0
    }

    #[cfg(test)]
    pub fn processing_changes(&self) -> Vec<bool> {
        self.0
            .iter()
            .filter_map(|effect| match effect {
                Effect::Processing(value) => Some(*value),
                Effect::Permission(_) => None,
            })
            .collect()
    }

    #[cfg(test)]
    pub fn permission_count(&self) -> usize {
        self.0
            .iter()
            .filter(|effect| matches!(effect, Effect::Permission(_)))
            .count()
    }
}

/// Apply one op to a session.
pub(crate) fn apply_op(state: &mut SessionState, op: TranscriptOp, effects: &mut Effects) {
    match op {
        TranscriptOp::SessionStarted(info) => {
            state.session_info = Some(info);
            state.is_connected = true;
            set_processing(state, true, effects);
        }
        TranscriptOp::StartAssistant => {
            close_current(state);
            let message =
                TranscriptMessage::new(MessageBody::Assistant(AssistantMessage::streaming()));
            state.streaming_id = Some(message.id.clone());
            state.messages.push(message);
        }
        TranscriptOp::AppendText(delta) => {
            state.with_streaming_assistant(|msg| msg.push_text(&delta));
        }
        TranscriptOp::AppendReasoning(delta) => {
            state.with_streaming_assistant(|msg| msg.push_reasoning(&delta));
        }
        TranscriptOp::EndMessage => end_current(state),
        TranscriptOp::StopMessage => close_current(state),
        TranscriptOp::FinalizeAssistant { text, reasoning } => {
            finalize_assistant(state, text, reasoning)
        }
        TranscriptOp::OpenToolCall(open) => open_tool_call(state, open),
        TranscriptOp::AttachToolResult {
            call_id,
            result,
            is_error,
            subagent,
        } => attach_tool_result(state, &call_id, result, is_error, subagent),
        TranscriptOp::ClosePendingToolCalls => close_pending_tool_calls(state),
        TranscriptOp::AddCost(amount) => tracker::add_cost(state, amount),
        TranscriptOp::TurnEnded { cost, error } => {
            close_current(state);
            set_processing(state, false, effects);
            tracker::add_cost(state, cost.unwrap_or(0.0));
            if let Some(text) = error {
                state
                    .messages
                    .push(TranscriptMessage::new(MessageBody::System(SystemMessage {
                        text,
                        is_error: true,
                    })));
            }
        }
        TranscriptOp::PermissionRequested(pending) => {
            tracker::set_permission(state, pending, effects);
        }
        TranscriptOp::PermissionCancelled { request_id } => {
            tracker::cancel_permission(state, &request_id);
        }
        TranscriptOp::Nested { parent_call_id, op } => {
            nesting::apply_nested(state, &parent_call_id, op);
        }
    }
}

/// Change `is_processing`, recording a notification only on a real transition
pub(crate) fn set_processing(state: &mut SessionState, value: bool, effects: &mut Effects) {
    if state.is_processing != value {
        state.is_processing = value;
        effects.push(Effect::Processing(value));
    }
}

/// Drop the current message if it is empty, otherwise stop it streaming
fn end_current(state: &mut SessionState) {
    let Some(id) = state.streaming_id.clone() else {
        return;
    };
    let Some(index) = state.position(&id) else {
        state.streaming_id = None;
        return;
    };

    let empty = match state.messages[index].as_assistant_mut() {
        Some(msg) if msg.is_empty() => true,
        Some(msg) => {
            msg.finish();
            false
        }
        None => true,
    };
    if empty {
        if state.messages[index].as_assistant().is_some() {
            state.messages.remove(index);
        }
        state.streaming_id = None;
    }
}

/// Authoritative end of the current message: same pruning, then forget it
fn close_current(state: &mut SessionState) {
    end_current(state);
    state.streaming_id = None;
}

fn finalize_assistant(state: &mut SessionState, text: Option<String>, reasoning: Option<String>) {
    let target = state
        .streaming_id
        .as_deref()
        .and_then(|id| state.position(id))
        .filter(|&index| state.messages[index].as_assistant().is_some())
        .or_else(|| state.messages.iter().rposition(TranscriptMessage::is_streaming));

    let Some(index) = target else {
        let has_content = text.as_deref().is_some_and(|t| !t.is_empty())
            || reasoning.as_deref().is_some_and(|r| !r.is_empty());
        if has_content {
            let reasoning_finalized = reasoning.is_some();
            state
                .messages
                .push(TranscriptMessage::new(MessageBody::Assistant(AssistantMessage {
                    text: text.unwrap_or_default(),
                    reasoning,
                    is_streaming: false,
                    reasoning_finalized,
                })));
        }
        return;
    };

    let Some(msg) = state.messages[index].as_assistant_mut() else {
        return;
    };
    if let Some(text) = text {
        msg.text = text;
    }
    if let Some(reasoning) = reasoning {
        msg.reasoning = Some(reasoning);
    }
    if !msg.text.is_empty() && msg.reasoning.is_some() {
        msg.reasoning_finalized = true;
    }

    if msg.is_empty() {
        let removed = state.messages.remove(index);
        if state.streaming_id.as_deref() == Some(removed.id.as_str()) {
            state.streaming_id = None;
        }
    }
}

fn open_tool_call(state: &mut SessionState, open: ToolCallOpen) {
    if state.tool_call(&open.call_id).is_some() {
        tracing::debug!(call_id = %open.call_id, "tool call already open");
        return;
    }

    let mut call = ToolCallMessage::new(open.call_id, open.tool_name, open.input);
    let finished = open.result.is_some();
    call.result = open.result;
    if open.is_error {
        call.is_error = Some(true);
    }

    if let Some(run) = call.subagent.as_mut()
        && finished
    {
        run.status = SubagentStatus::Completed;
    }

    let message = TranscriptMessage::new(MessageBody::ToolCall(call));
    if let Some(call) = message.as_tool_call()
        && call.subagent.as_ref().is_some_and(|run| run.status == SubagentStatus::Running)
    {
        state
            .parent_map
            .insert(call.call_id.clone(), message.id.clone());
    }
    state.messages.push(message);
}

fn attach_tool_result(
    state: &mut SessionState,
    call_id: &str,
    result: ToolResult,
    is_error: bool,
    summary: Option<SubagentSummary>,
) {
    let Some(call) = state.tool_call_mut(call_id) else {
        tracing::debug!(call_id, "dropping result for unknown tool call");
        return;
    };

    call.result = Some(result);
    if is_error {
        call.is_error = Some(true);
    }

    let Some(run) = call.subagent.as_mut() else {
        return;
    };
    run.status = SubagentStatus::Completed;
    if let Some(summary) = summary {
        run.nested_session_id = summary.nested_session_id.or(run.nested_session_id.take());
        run.duration_ms = summary.duration_ms.or(run.duration_ms);
        run.total_tokens = summary.total_tokens.or(run.total_tokens);
    }
    state.parent_map.remove(call_id);
}

fn close_pending_tool_calls(state: &mut SessionState) {
    for call in state
        .messages
        .iter_mut()
        .filter_map(TranscriptMessage::as_tool_call_mut)
        .filter(|call| call.is_pending())
    {
        call.result = Some(ToolResult::empty());
    }
}
