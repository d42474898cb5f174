// Nested agent activity is addressed by the call id of the tool that spawned
// it and lands as steps under that tool call, never as top-level messages.

use agfold_types::{NestedOp, SubagentRun};

use crate::state::SessionState;

/// Host run registered for a nested-agent call id
fn host_run<'a>(state: &'a mut SessionState, parent_call_id: &str) -> Option<&'a mut SubagentRun> {
    let host_id = state.parent_map.get(parent_call_id)?.clone();
    state
        .messages
        .iter_mut()
        .find(|m| m.id == host_id)?
        .as_tool_call_mut()?
        .subagent
        .as_mut()
}

/// Apply a nested op to the host tool call; untracked parents are dropped.
pub(crate) fn apply_nested(state: &mut SessionState, parent_call_id: &str, op: NestedOp) {
    let Some(run) = host_run(state, parent_call_id) else {
        tracing::debug!(parent_call_id, "dropping nested event for untracked parent");
        return;
    };

    match op {
        NestedOp::AddSteps { steps } => {
            for step in steps {
                if run.steps.iter().any(|s| s.call_id == step.call_id) {
                    continue;
                }
                run.steps.push(step);
            }
        }
        NestedOp::AttachStepResult { call_id, result } => {
            match run.steps.iter_mut().find(|s| s.call_id == call_id) {
                Some(step) => step.result = Some(result),
                None => tracing::debug!(%call_id, parent_call_id, "dropping result for unknown step"),
            }
        }
    }
}
