use agfold_types::{NestedOp, SubagentStep, ToolCallOpen, ToolResult, TranscriptOp};

use super::schema::{SessionUpdate, ToolCallFields};
use super::tools::{derive_tool_input, derive_tool_name, tool_output};
use crate::options::NormalizeOptions;

/// Normalize one ACP session update into transcript mutations.
pub fn normalize_update(update: &SessionUpdate, options: &NormalizeOptions) -> Vec<TranscriptOp> {
    if let Some(parent) = update.parent_tool_call_id() {
        return normalize_nested(parent, update, options);
    }

    // Cost updates may arrive while a tool is still running
    if let SessionUpdate::UsageUpdate(usage) = update {
        return usage
            .cost
            .as_ref()
            .map(|cost| TranscriptOp::AddCost(cost.amount))
            .into_iter()
            .collect();
    }

    let mut ops = Vec::new();
    // Fast tools may never get a finishing update
    if options.close_pending_on_update {
        ops.push(TranscriptOp::ClosePendingToolCalls);
    }

    match update {
        SessionUpdate::AgentMessageChunk(chunk) => {
            if let Some(text) = chunk.content.as_text().filter(|t| !t.is_empty()) {
                ops.push(TranscriptOp::AppendText(text.to_string()));
            }
        }
        SessionUpdate::AgentThoughtChunk(chunk) => {
            if let Some(text) = chunk.content.as_text().filter(|t| !t.is_empty()) {
                ops.push(TranscriptOp::AppendReasoning(text.to_string()));
            }
        }
        SessionUpdate::ToolCall(fields) => {
            ops.push(TranscriptOp::StopMessage);
            ops.push(TranscriptOp::OpenToolCall(open_tool_call(fields, options)));
        }
        SessionUpdate::ToolCallUpdate(fields) => {
            let output = tool_output(fields);
            if output.is_some() || fields.is_terminal() {
                ops.push(TranscriptOp::AttachToolResult {
                    call_id: fields.tool_call_id.clone(),
                    result: ToolResult::new(output.unwrap_or_default()),
                    is_error: fields.is_failed(),
                    subagent: None,
                });
            }
        }
        // User chunks echo the prompt recorded at turn start
        SessionUpdate::UserMessageChunk(_) | SessionUpdate::Unknown => {}
        SessionUpdate::UsageUpdate(_) => {}
    }

    ops
}

/// Ops for the end of a prompt turn (the `session/prompt` response).
pub fn complete_turn_ops() -> Vec<TranscriptOp> {
    vec![
        TranscriptOp::StopMessage,
        TranscriptOp::ClosePendingToolCalls,
        TranscriptOp::TurnEnded {
            cost: None,
            error: None,
        },
    ]
}

fn open_tool_call(fields: &ToolCallFields, options: &NormalizeOptions) -> ToolCallOpen {
    let tool_name = derive_tool_name(fields);
    let input = derive_tool_input(&tool_name, fields, options);
    let result = fields
        .is_terminal()
        .then(|| ToolResult::new(tool_output(fields).unwrap_or_default()));

    ToolCallOpen {
        call_id: fields.tool_call_id.clone(),
        tool_name,
        input,
        result,
        is_error: fields.is_failed(),
    }
}

fn normalize_nested(
    parent: &str,
    update: &SessionUpdate,
    options: &NormalizeOptions,
) -> Vec<TranscriptOp> {
    let op = match update {
        SessionUpdate::ToolCall(fields) => {
            let open = open_tool_call(fields, options);
            NestedOp::AddSteps {
                steps: vec![SubagentStep {
                    call_id: open.call_id,
                    tool_name: open.tool_name,
                    input: open.input,
                    result: open.result,
                }],
            }
        }
        SessionUpdate::ToolCallUpdate(fields) => match tool_output(fields) {
            Some(output) => NestedOp::AttachStepResult {
                call_id: fields.tool_call_id.clone(),
                result: ToolResult::new(output),
            },
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    vec![TranscriptOp::Nested {
        parent_call_id: parent.to_string(),
        op,
    }]
}
