use serde::{Deserialize, Serialize};

/// Tool classification by semantic purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Read operations (files, resources, data)
    Read,
    /// Write operations (edit, create, patch)
    Write,
    /// Execute operations (shell commands, scripts)
    Execute,
    /// Search operations (web, file search, grep)
    Search,
    /// Nested agent loop; its own tool calls become subagent steps
    Agent,
    /// Other/unknown operations
    Other,
}

impl ToolKind {
    pub fn is_nested_agent(self) -> bool {
        self == ToolKind::Agent
    }
}
