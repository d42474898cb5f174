use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::args::{
    AgentArgs, ExecuteArgs, FileEditArgs, FileReadArgs, FileWriteArgs, McpArgs, SearchArgs,
};
use super::kind::ToolKind;

/// Normalized tool input with structured arguments
///
/// Both protocols are folded into this shape, so a transcript never needs to
/// know which wire format a tool call arrived on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "arguments", rename_all = "snake_case")]
pub enum ToolInput {
    /// File read operation (Read, etc.)
    FileRead(FileReadArgs),

    /// File edit operation (Edit)
    FileEdit(FileEditArgs),

    /// File write operation (Write)
    FileWrite(FileWriteArgs),

    /// Execute/shell command (Bash, etc.)
    Execute(ExecuteArgs),

    /// Search operation (Grep, Glob, WebSearch, WebFetch)
    Search(SearchArgs),

    /// Nested agent invocation (Task)
    Agent(AgentArgs),

    /// MCP (Model Context Protocol) tool call
    Mcp(McpArgs),

    /// Generic/fallback for unknown or custom tools
    Generic(Value),
}

impl ToolInput {
    /// Derive semantic ToolKind from the variant
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInput::FileRead(_) => ToolKind::Read,
            ToolInput::FileEdit(_) => ToolKind::Write,
            ToolInput::FileWrite(_) => ToolKind::Write,
            ToolInput::Execute(_) => ToolKind::Execute,
            ToolInput::Search(_) => ToolKind::Search,
            ToolInput::Agent(_) => ToolKind::Agent,
            ToolInput::Mcp(_) => ToolKind::Other,
            ToolInput::Generic(_) => ToolKind::Other,
        }
    }

    pub fn is_nested_agent(&self) -> bool {
        self.kind().is_nested_agent()
    }

    /// Short human-readable summary (path, command, pattern, description)
    pub fn summary(&self) -> Option<&str> {
        match self {
            ToolInput::FileRead(args) => args.path().or(args.pattern.as_deref()),
            ToolInput::FileEdit(args) => Some(&args.file_path),
            ToolInput::FileWrite(args) => Some(&args.file_path),
            ToolInput::Execute(args) => args.description.as_deref().or(args.command()),
            ToolInput::Search(args) => args.pattern(),
            ToolInput::Agent(args) => args.description.as_deref(),
            ToolInput::Mcp(args) => Some(&args.tool),
            ToolInput::Generic(_) => None,
        }
    }
}

impl Default for ToolInput {
    fn default() -> Self {
        ToolInput::Generic(Value::Null)
    }
}
