use agfold_types::{
    PendingPermission, PermissionOption, PermissionOptionKind, PermissionRequest, Protocol,
    RawPermission,
};
use serde_json::Value;

use super::schema::ControlRequestEvent;
use crate::normalization::normalize_tool_input;
use crate::options::NormalizeOptions;

/// Control request subtype asking the client whether a tool may run
pub const CAN_USE_TOOL: &str = "can_use_tool";

/// Normalize a `can_use_tool` control request.
///
/// Returns `None` for other control subtypes (interrupts, hook callbacks).
pub fn normalize_permission_request(
    event: &ControlRequestEvent,
    options: &NormalizeOptions,
) -> Option<PendingPermission> {
    let body = &event.request;
    if body.subtype != CAN_USE_TOOL {
        return None;
    }

    let tool_name = body.tool_name.clone().unwrap_or_else(|| "Tool".to_string());
    let input = normalize_tool_input(
        &tool_name,
        body.input.clone().unwrap_or(Value::Null),
        options,
    );

    let mut choices = vec![PermissionOption {
        id: "allow".to_string(),
        label: "Allow".to_string(),
        kind: PermissionOptionKind::AllowOnce,
    }];
    // "Always allow" writes a rule, which needs the suggestions the agent offered
    if body
        .permission_suggestions
        .as_ref()
        .is_some_and(|s| !s.is_null())
    {
        choices.push(PermissionOption {
            id: "allow_always".to_string(),
            label: "Always allow".to_string(),
            kind: PermissionOptionKind::AllowAlways,
        });
    }
    choices.push(PermissionOption {
        id: "deny".to_string(),
        label: "Deny".to_string(),
        kind: PermissionOptionKind::RejectOnce,
    });

    let title = input
        .summary()
        .map(|summary| format!("{}: {}", tool_name, summary))
        .or_else(|| body.decision_reason.clone());

    let raw = serde_json::to_value(event)
        .ok()
        .map(|payload| RawPermission {
            protocol: Protocol::StreamJson,
            payload,
        });

    Some(PendingPermission {
        request: PermissionRequest {
            request_id: event.request_id.clone(),
            tool_call_id: body.tool_use_id.clone(),
            tool_name,
            input,
            title,
            options: choices,
        },
        raw,
    })
}
