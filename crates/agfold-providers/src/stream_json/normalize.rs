use agfold_types::{
    NestedOp, SessionInfo, SubagentStep, SubagentSummary, ToolCallOpen, ToolResult, TranscriptOp,
};
use serde_json::Value;

use super::permission::normalize_permission_request;
use super::schema::*;
use super::turn_error::turn_error_message;
use crate::normalization::normalize_tool_input;
use crate::options::NormalizeOptions;

/// Normalize one stream-json event into transcript mutations.
///
/// Events that carry `parent_tool_use_id` belong to a nested agent and are
/// turned into `Nested` ops addressed to the host tool call.
pub fn normalize_event(event: &StreamJsonEvent, options: &NormalizeOptions) -> Vec<TranscriptOp> {
    if let Some(parent) = event.parent_tool_use_id() {
        return normalize_nested(parent, event, options);
    }

    match event {
        StreamJsonEvent::System(system) => normalize_system(system),
        StreamJsonEvent::StreamEvent(envelope) => normalize_stream_delta(&envelope.event),
        StreamJsonEvent::Assistant(assistant) => normalize_assistant(assistant, options),
        StreamJsonEvent::User(user) => normalize_user(user),
        StreamJsonEvent::Result(result) => normalize_result(result),
        StreamJsonEvent::ControlRequest(control) => normalize_permission_request(control, options)
            .map(TranscriptOp::PermissionRequested)
            .into_iter()
            .collect(),
        StreamJsonEvent::ControlCancelRequest(cancel) => vec![TranscriptOp::PermissionCancelled {
            request_id: cancel.request_id.clone(),
        }],
        StreamJsonEvent::Unknown => {
            tracing::debug!("ignoring unknown stream-json event");
            Vec::new()
        }
    }
}

fn normalize_system(system: &SystemEvent) -> Vec<TranscriptOp> {
    if system.subtype != "init" {
        tracing::debug!(subtype = %system.subtype, "ignoring system event");
        return Vec::new();
    }

    vec![TranscriptOp::SessionStarted(SessionInfo {
        model: system.model.clone(),
        cwd: system.cwd.clone(),
        tools: system.tools.clone(),
        protocol_version: system.version.clone(),
        agent_session_id: system.session_id.clone(),
        permission_mode: system.permission_mode.clone(),
    })]
}

fn normalize_stream_delta(delta: &StreamDelta) -> Vec<TranscriptOp> {
    match delta {
        StreamDelta::MessageStart { .. } => vec![TranscriptOp::StartAssistant],
        StreamDelta::ContentBlockDelta { delta, .. } => match delta {
            BlockDelta::TextDelta { text } => vec![TranscriptOp::AppendText(text.clone())],
            BlockDelta::ThinkingDelta { thinking } => {
                vec![TranscriptOp::AppendReasoning(thinking.clone())]
            }
            // Tool input arrives complete on the finalized assistant event
            BlockDelta::InputJsonDelta { .. }
            | BlockDelta::SignatureDelta { .. }
            | BlockDelta::Unknown => Vec::new(),
        },
        StreamDelta::MessageDelta { .. } => vec![TranscriptOp::EndMessage],
        StreamDelta::MessageStop => vec![TranscriptOp::StopMessage],
        StreamDelta::ContentBlockStart { .. }
        | StreamDelta::ContentBlockStop { .. }
        | StreamDelta::Unknown => Vec::new(),
    }
}

fn normalize_assistant(event: &AssistantEvent, options: &NormalizeOptions) -> Vec<TranscriptOp> {
    let mut text: Option<String> = None;
    let mut reasoning: Option<String> = None;
    let mut tool_calls = Vec::new();

    for block in &event.message.content {
        match block {
            AssistantContent::Text { text: t } => text.get_or_insert_with(String::new).push_str(t),
            AssistantContent::Thinking { thinking, .. } => {
                reasoning.get_or_insert_with(String::new).push_str(thinking)
            }
            AssistantContent::ToolUse { id, name, input } => {
                tool_calls.push(TranscriptOp::OpenToolCall(ToolCallOpen {
                    call_id: id.clone(),
                    tool_name: name.clone(),
                    input: normalize_tool_input(name, input.clone(), options),
                    result: None,
                    is_error: false,
                }));
            }
            AssistantContent::Unknown => {}
        }
    }

    let mut ops = Vec::with_capacity(tool_calls.len() + 1);
    ops.push(TranscriptOp::FinalizeAssistant { text, reasoning });
    ops.extend(tool_calls);
    ops
}

fn normalize_user(event: &UserEvent) -> Vec<TranscriptOp> {
    // Prompt text is recorded when the turn begins, so only tool results matter here
    let subagent = event
        .tool_use_result
        .as_ref()
        .filter(|meta| !meta.is_empty())
        .map(|meta| SubagentSummary {
            nested_session_id: meta.agent_id.clone(),
            duration_ms: meta.total_duration_ms,
            total_tokens: meta.total_tokens,
        });

    event
        .message
        .content
        .iter()
        .filter_map(|block| match block {
            UserContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some(TranscriptOp::AttachToolResult {
                call_id: tool_use_id.clone(),
                result: ToolResult::new(flatten_result_content(content.as_ref())),
                is_error: *is_error,
                subagent: subagent.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn normalize_result(result: &ResultEvent) -> Vec<TranscriptOp> {
    let error = result.is_failure().then(|| turn_error_message(result));
    vec![
        TranscriptOp::StopMessage,
        TranscriptOp::TurnEnded {
            cost: result.total_cost_usd,
            error,
        },
    ]
}

fn normalize_nested(
    parent: &str,
    event: &StreamJsonEvent,
    options: &NormalizeOptions,
) -> Vec<TranscriptOp> {
    let nested = |op: NestedOp| TranscriptOp::Nested {
        parent_call_id: parent.to_string(),
        op,
    };

    match event {
        StreamJsonEvent::Assistant(assistant) => {
            let steps: Vec<SubagentStep> = assistant
                .message
                .content
                .iter()
                .filter_map(|block| match block {
                    AssistantContent::ToolUse { id, name, input } => Some(SubagentStep {
                        call_id: id.clone(),
                        tool_name: name.clone(),
                        input: normalize_tool_input(name, input.clone(), options),
                        result: None,
                    }),
                    _ => None,
                })
                .collect();

            if steps.is_empty() {
                Vec::new()
            } else {
                vec![nested(NestedOp::AddSteps { steps })]
            }
        }
        StreamJsonEvent::User(user) => user
            .message
            .content
            .iter()
            .filter_map(|block| match block {
                UserContent::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => Some(nested(NestedOp::AttachStepResult {
                    call_id: tool_use_id.clone(),
                    result: ToolResult::new(flatten_result_content(content.as_ref())),
                })),
                _ => None,
            })
            .collect(),
        // Nested text streams are not shown
        _ => Vec::new(),
    }
}

/// Flatten a `tool_result` content payload (string or block array) into text.
pub fn flatten_result_content(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agfold_types::ToolInput;
    use serde_json::json;

    fn normalize(line: &str) -> Vec<TranscriptOp> {
        let event: StreamJsonEvent = serde_json::from_str(line).unwrap();
        normalize_event(&event, &NormalizeOptions::default())
    }

    #[test]
    fn test_init_starts_session() {
        let ops = normalize(
            r#"{"type":"system","subtype":"init","session_id":"abc","model":"claude-sonnet-4-5","cwd":"/work","tools":["Bash","Read"],"claude_code_version":"2.0.1","permissionMode":"default"}"#,
        );

        insta::assert_json_snapshot!(ops, @r#"
        [
          {
            "op": "session_started",
            "data": {
              "model": "claude-sonnet-4-5",
              "cwd": "/work",
              "tools": [
                "Bash",
                "Read"
              ],
              "protocol_version": "2.0.1",
              "agent_session_id": "abc",
              "permission_mode": "default"
            }
          }
        ]
        "#);
    }

    #[test]
    fn test_non_init_system_events_are_ignored() {
        assert!(normalize(r#"{"type":"system","subtype":"compact_boundary"}"#).is_empty());
        assert!(normalize(r#"{"type":"system","subtype":"status","status":"compacting"}"#).is_empty());
    }

    #[test]
    fn test_stream_deltas() {
        assert_eq!(
            normalize(r#"{"type":"stream_event","event":{"type":"message_start","message":{}}}"#),
            vec![TranscriptOp::StartAssistant]
        );
        assert_eq!(
            normalize(
                r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}}"#
            ),
            vec![TranscriptOp::AppendReasoning("hmm".to_string())]
        );
        assert!(
            normalize(
                r#"{"type":"stream_event","event":{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"a"}}}"#
            )
            .is_empty()
        );
        assert_eq!(
            normalize(r#"{"type":"stream_event","event":{"type":"message_delta","delta":{"stop_reason":"end_turn"}}}"#),
            vec![TranscriptOp::EndMessage]
        );
        assert_eq!(
            normalize(r#"{"type":"stream_event","event":{"type":"message_stop"}}"#),
            vec![TranscriptOp::StopMessage]
        );
    }

    #[test]
    fn test_assistant_with_tool_use() {
        let ops = normalize(
            r#"{"type":"assistant","message":{"id":"msg_1","content":[{"type":"text","text":"Let me look."},{"type":"tool_use","id":"toolu_1","name":"Read","input":{"file_path":"src/lib.rs"}}]}}"#,
        );

        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0],
            TranscriptOp::FinalizeAssistant {
                text: Some("Let me look.".to_string()),
                reasoning: None,
            }
        );
        match &ops[1] {
            TranscriptOp::OpenToolCall(open) => {
                assert_eq!(open.call_id, "toolu_1");
                assert_eq!(open.tool_name, "Read");
                assert!(matches!(open.input, ToolInput::FileRead(_)));
                assert!(open.result.is_none());
            }
            other => panic!("Expected OpenToolCall, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_only_assistant_does_not_overwrite_text() {
        let ops = normalize(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"toolu_2","name":"Bash","input":{"command":"ls"}}]}}"#,
        );
        assert_eq!(
            ops[0],
            TranscriptOp::FinalizeAssistant {
                text: None,
                reasoning: None,
            }
        );
    }

    #[test]
    fn test_tool_result_with_agent_summary() {
        let ops = normalize(
            r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"toolu_task","content":[{"type":"text","text":"Found 3 files"},{"type":"text","text":"done"}]}]},"tool_use_result":{"status":"completed","agentId":"agent-7","totalDurationMs":4100,"totalTokens":900}}"#,
        );

        assert_eq!(
            ops,
            vec![TranscriptOp::AttachToolResult {
                call_id: "toolu_task".to_string(),
                result: ToolResult::new("Found 3 files\ndone"),
                is_error: false,
                subagent: Some(SubagentSummary {
                    nested_session_id: Some("agent-7".to_string()),
                    duration_ms: Some(4100),
                    total_tokens: Some(900),
                }),
            }]
        );
    }

    #[test]
    fn test_user_text_is_ignored() {
        assert!(normalize(r#"{"type":"user","message":{"role":"user","content":"hello"}}"#).is_empty());
    }

    #[test]
    fn test_result_success_and_error() {
        assert_eq!(
            normalize(r#"{"type":"result","subtype":"success","is_error":false,"total_cost_usd":0.25}"#),
            vec![
                TranscriptOp::StopMessage,
                TranscriptOp::TurnEnded {
                    cost: Some(0.25),
                    error: None,
                },
            ]
        );

        let ops = normalize(r#"{"type":"result","subtype":"error_during_execution","is_error":true}"#);
        match &ops[1] {
            TranscriptOp::TurnEnded { cost, error } => {
                assert_eq!(*cost, None);
                assert!(error.is_some());
            }
            other => panic!("Expected TurnEnded, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_events_become_steps() {
        let ops = normalize(
            r#"{"type":"assistant","parent_tool_use_id":"toolu_task","message":{"content":[{"type":"text","text":"searching"},{"type":"tool_use","id":"toolu_n1","name":"Grep","input":{"pattern":"fn main"}}]}}"#,
        );
        match ops.as_slice() {
            [
                TranscriptOp::Nested {
                    parent_call_id,
                    op: NestedOp::AddSteps { steps },
                },
            ] => {
                assert_eq!(parent_call_id, "toolu_task");
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].call_id, "toolu_n1");
            }
            other => panic!("Expected one AddSteps op, got {:?}", other),
        }

        let ops = normalize(
            r#"{"type":"user","parent_tool_use_id":"toolu_task","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_n1","content":"src/main.rs:1"}]}}"#,
        );
        assert_eq!(
            ops,
            vec![TranscriptOp::Nested {
                parent_call_id: "toolu_task".to_string(),
                op: NestedOp::AttachStepResult {
                    call_id: "toolu_n1".to_string(),
                    result: ToolResult::new("src/main.rs:1"),
                },
            }]
        );

        assert!(
            normalize(
                r#"{"type":"stream_event","parent_tool_use_id":"toolu_task","event":{"type":"message_start","message":{}}}"#
            )
            .is_empty()
        );
    }

    #[test]
    fn test_control_cancel() {
        assert_eq!(
            normalize(r#"{"type":"control_cancel_request","request_id":"req-1"}"#),
            vec![TranscriptOp::PermissionCancelled {
                request_id: "req-1".to_string()
            }]
        );
    }

    #[test]
    fn test_flatten_result_content() {
        assert_eq!(flatten_result_content(None), "");
        assert_eq!(flatten_result_content(Some(&json!("plain"))), "plain");
        assert_eq!(
            flatten_result_content(Some(&json!([{"type": "image", "source": {}}, {"type": "text", "text": "caption"}]))),
            "caption"
        );
        assert_eq!(flatten_result_content(Some(&json!({"code": 1}))), r#"{"code":1}"#);
    }
}
