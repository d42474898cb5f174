use agfold_types::PendingPermission;

use crate::apply::{Effect, Effects};
use crate::state::SessionState;

/// Store the pending permission request, replacing any earlier one.
pub(crate) fn set_permission(state: &mut SessionState, pending: PendingPermission, effects: &mut Effects) {
    if let Some(previous) = &state.pending_permission {
        tracing::debug!(
            request_id = %previous.request.request_id,
            "replacing unanswered permission request"
        );
    }
    effects.push(Effect::Permission(pending.request.clone()));
    state.pending_permission = Some(pending);
}

pub(crate) fn take_permission(state: &mut SessionState) -> Option<PendingPermission> {
    state.pending_permission.take()
}

/// Clear the pending request if it is the one being cancelled
pub(crate) fn cancel_permission(state: &mut SessionState, request_id: &str) -> bool {
    let matches = state
        .pending_permission
        .as_ref()
        .is_some_and(|pending| pending.request.request_id == request_id);
    if matches {
        state.pending_permission = None;
    }
    matches
}

/// Add to the running cost; negative or non-finite amounts are ignored.
pub(crate) fn add_cost(state: &mut SessionState, amount: f64) {
    if !amount.is_finite() || amount < 0.0 {
        tracing::debug!(amount, "ignoring invalid cost delta");
        return;
    }
    state.total_cost += amount;
}

#[cfg(test)]
mod tests {
    use super::*;
    use agfold_types::{PermissionRequest, ToolInput};

    fn pending(request_id: &str) -> PendingPermission {
        PendingPermission {
            request: PermissionRequest {
                request_id: request_id.to_string(),
                tool_call_id: None,
                tool_name: "Bash".to_string(),
                input: ToolInput::default(),
                title: None,
                options: Vec::new(),
            },
            raw: None,
        }
    }

    #[test]
    fn test_new_request_replaces_old() {
        let mut state = SessionState::new();
        let mut effects = Effects::default();
        set_permission(&mut state, pending("r1"), &mut effects);
        set_permission(&mut state, pending("r2"), &mut effects);

        assert_eq!(effects.permission_count(), 2);
        assert_eq!(
            state.pending_permission.as_ref().map(|p| p.request.request_id.as_str()),
            Some("r2")
        );
    }

    #[test]
    fn test_cancel_only_matching_request() {
        let mut state = SessionState::new();
        set_permission(&mut state, pending("r1"), &mut Effects::default());

        assert!(!cancel_permission(&mut state, "other"));
        assert!(state.pending_permission.is_some());
        assert!(cancel_permission(&mut state, "r1"));
        assert!(take_permission(&mut state).is_none());
    }

    #[test]
    fn test_cost_accumulates_and_ignores_garbage() {
        let mut state = SessionState::new();
        add_cost(&mut state, 0.25);
        add_cost(&mut state, -1.0);
        add_cost(&mut state, f64::NAN);
        add_cost(&mut state, 0.5);
        assert_eq!(state.total_cost, 0.75);
    }
}
