use agfold_types::{PendingPermission, PermissionOption, PermissionRequest, Protocol, RawPermission};
use serde_json::Value;

use super::schema::PermissionRpcRequest;
use super::tools::{derive_tool_input, derive_tool_name};
use crate::options::NormalizeOptions;

/// Normalize a `session/request_permission` request.
///
/// The whole request is kept as the raw form; answering needs its JSON-RPC id
/// and the agent's option ids.
pub fn normalize_permission_request(
    rpc: &PermissionRpcRequest,
    options: &NormalizeOptions,
) -> PendingPermission {
    let tool_call = &rpc.params.tool_call;
    let tool_name = derive_tool_name(tool_call);
    let input = derive_tool_input(&tool_name, tool_call, options);

    let choices = rpc
        .params
        .options
        .iter()
        .map(|option| PermissionOption {
            id: option.option_id.clone(),
            label: option.name.clone(),
            kind: option.kind,
        })
        .collect();

    let request_id = match &rpc.id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let raw = serde_json::to_value(rpc)
        .ok()
        .map(|payload| RawPermission {
            protocol: Protocol::Acp,
            payload,
        });

    PendingPermission {
        request: PermissionRequest {
            request_id,
            tool_call_id: Some(tool_call.tool_call_id.clone()),
            tool_name,
            input,
            title: tool_call.title.clone(),
            options: choices,
        },
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agfold_types::PermissionOptionKind;

    #[test]
    fn test_normalize_acp_permission() {
        let rpc: PermissionRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":7,"method":"session/request_permission","params":{"sessionId":"s1","toolCall":{"toolCallId":"call_3","title":"`rm -rf target`","kind":"execute","rawInput":{"command":"rm -rf target"}},"options":[{"optionId":"allow","name":"Allow","kind":"allow_once"},{"optionId":"always","name":"Always Allow","kind":"allow_always"},{"optionId":"reject","name":"Reject","kind":"reject_once"}]}}"#,
        )
        .unwrap();

        let pending = normalize_permission_request(&rpc, &NormalizeOptions::default());
        let request = &pending.request;

        assert_eq!(request.request_id, "7");
        assert_eq!(request.tool_call_id.as_deref(), Some("call_3"));
        assert_eq!(request.tool_name, "Bash");
        assert_eq!(request.input.summary(), Some("rm -rf target"));
        assert_eq!(request.options.len(), 3);
        assert!(request.options[1].kind.is_allow());
        assert_eq!(request.options[2].kind, PermissionOptionKind::RejectOnce);

        let raw = pending.raw.as_ref().unwrap();
        assert_eq!(raw.protocol, Protocol::Acp);
        assert_eq!(raw.payload["id"], 7);
        assert_eq!(raw.payload["params"]["options"][1]["optionId"], "always");
    }
}
