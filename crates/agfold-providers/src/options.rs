use serde::{Deserialize, Serialize};

/// Tool names that run a nested agent loop unless configured otherwise
pub const DEFAULT_NESTED_AGENT_TOOLS: &[&str] = &["Task", "Agent"];

/// Knobs shared by both protocol normalizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Tool names whose calls host subagent steps
    pub nested_agent_tools: Vec<String>,

    /// ACP: mark still-running tool calls finished when the next update arrives
    pub close_pending_on_update: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            nested_agent_tools: DEFAULT_NESTED_AGENT_TOOLS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            close_pending_on_update: true,
        }
    }
}

impl NormalizeOptions {
    pub fn is_nested_agent(&self, tool_name: &str) -> bool {
        self.nested_agent_tools.iter().any(|name| name == tool_name)
    }
}
