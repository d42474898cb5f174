// Tool input normalization from raw protocol data to typed ToolInput variants
//
// Both protocols end up here: stream-json hands over the model's own tool
// name and input, ACP hands over a name derived from its title/kind metadata
// and its rawInput. Unknown tools, or known tools whose arguments do not
// parse, fall back to Generic with the raw JSON untouched.

use agfold_types::{McpArgs, ToolInput};
use serde_json::Value;

use crate::options::NormalizeOptions;

/// Normalize raw tool call data into a typed ToolInput variant
///
/// # Arguments
/// * `name` - Tool name (e.g., "Read", "Bash", "mcp__o3__search")
/// * `arguments` - Raw JSON arguments
/// * `options` - Decides which tool names are nested-agent tools
pub fn normalize_tool_input(name: &str, arguments: Value, options: &NormalizeOptions) -> ToolInput {
    if options.is_nested_agent(name) {
        return match serde_json::from_value(arguments.clone()) {
            Ok(args) => ToolInput::Agent(args),
            Err(_) => ToolInput::Agent(agfold_types::AgentArgs {
                description: None,
                prompt: None,
                subagent_type: None,
                extra: match arguments {
                    Value::Object(map) => map,
                    _ => Default::default(),
                },
            }),
        };
    }

    match name {
        "Read" | "NotebookRead" => {
            if let Ok(args) = serde_json::from_value(arguments.clone()) {
                return ToolInput::FileRead(args);
            }
        }
        "Edit" | "MultiEdit" | "NotebookEdit" => {
            if let Ok(args) = serde_json::from_value(arguments.clone()) {
                return ToolInput::FileEdit(args);
            }
        }
        "Write" => {
            if let Ok(args) = serde_json::from_value(arguments.clone()) {
                return ToolInput::FileWrite(args);
            }
        }
        "Bash" | "BashOutput" | "KillShell" => {
            if let Ok(args) = serde_json::from_value(arguments.clone()) {
                return ToolInput::Execute(args);
            }
        }
        "Grep" | "Glob" | "WebSearch" | "WebFetch" => {
            if let Ok(args) = serde_json::from_value(arguments.clone()) {
                return ToolInput::Search(args);
            }
        }
        _ => {
            if let Some((server, tool)) = parse_mcp_name(name) {
                return ToolInput::Mcp(McpArgs {
                    server,
                    tool,
                    arguments,
                });
            }
        }
    }

    ToolInput::Generic(arguments)
}

/// Split a `mcp__server__tool` name into `(server, tool)`
pub fn parse_mcp_name(full_name: &str) -> Option<(String, String)> {
    let rest = full_name.strip_prefix("mcp__")?;
    let (server, tool) = rest.split_once("__")?;
    if server.is_empty() || tool.is_empty() {
        return None;
    }
    Some((server.to_string(), tool.to_string()))
}
