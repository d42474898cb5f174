// ACP describes tools by title/kind metadata instead of the model's tool
// name, so both the name and the input shape have to be reconstructed.

use agfold_types::ToolInput;
use serde_json::{Map, Value};

use super::schema::{ToolCallContent, ToolCallFields};
use crate::normalization::normalize_tool_input;
use crate::options::NormalizeOptions;

/// Tool name implied by an ACP tool kind
fn kind_tool_name(kind: &str) -> Option<&'static str> {
    match kind {
        "read" => Some("Read"),
        "edit" => Some("Edit"),
        "delete" => Some("Delete"),
        "move" => Some("Move"),
        "search" => Some("Grep"),
        "execute" => Some("Bash"),
        "fetch" => Some("WebFetch"),
        "think" => Some("Think"),
        _ => None,
    }
}

/// Tool name carried by agent-specific metadata (`_meta.claudeCode.toolName`)
fn meta_tool_name(meta: Option<&Value>) -> Option<&str> {
    let meta = meta?;
    meta.get("claudeCode")
        .and_then(|cc| cc.get("toolName"))
        .or_else(|| meta.get("toolName"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Derive a tool name for an ACP tool call.
///
/// Priority: meta toolName > kind mapping > title > rawInput.name >
/// rawInput.tool > kind > "Tool"
pub fn derive_tool_name(fields: &ToolCallFields) -> String {
    if let Some(name) = meta_tool_name(fields.meta.as_ref()) {
        return name.to_string();
    }

    let kind = non_empty(fields.kind.as_deref());
    if let Some(name) = kind.and_then(kind_tool_name) {
        return name.to_string();
    }

    if let Some(title) = non_empty(fields.title.as_deref()) {
        return title.to_string();
    }

    if let Some(Value::Object(obj)) = &fields.raw_input {
        for key in ["name", "tool"] {
            if let Some(name) = non_empty(obj.get(key).and_then(Value::as_str)) {
                return name.to_string();
            }
        }
    }

    kind.unwrap_or("Tool").to_string()
}

/// Build the normalized input from `rawInput`, filling the file path from
/// `locations` when the agent only reported it there.
pub fn derive_tool_input(
    tool_name: &str,
    fields: &ToolCallFields,
    options: &NormalizeOptions,
) -> ToolInput {
    let mut raw = match &fields.raw_input {
        Some(Value::Object(obj)) => obj.clone(),
        Some(other) => return normalize_tool_input(tool_name, other.clone(), options),
        None => Map::new(),
    };

    let first_path = fields
        .locations
        .as_ref()
        .and_then(|locations| locations.first())
        .map(|location| location.path.clone());
    if let Some(path) = first_path
        && matches!(fields.kind.as_deref(), Some("read" | "edit"))
        && !raw.contains_key("file_path")
        && !raw.contains_key("path")
    {
        raw.insert("file_path".to_string(), Value::String(path));
    }

    normalize_tool_input(tool_name, Value::Object(raw), options)
}

/// Text output of a tool call: content items first, then `rawOutput`.
///
/// Returns `None` when the update carries no output at all.
pub fn tool_output(fields: &ToolCallFields) -> Option<String> {
    let mut parts = Vec::new();
    for item in fields.content.iter().flatten() {
        match item {
            ToolCallContent::Content { content } => {
                if let Some(text) = content.as_text() {
                    parts.push(text.to_string());
                }
            }
            ToolCallContent::Diff { path, .. } => parts.push(format!("Updated {}", path)),
            ToolCallContent::Terminal { .. } | ToolCallContent::Unknown => {}
        }
    }
    if !parts.is_empty() {
        return Some(parts.join("\n"));
    }

    fields.raw_output.as_ref().map(raw_output_text)
}

fn raw_output_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(obj) => ["output", "stdout", "content"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agfold_types::ToolKind;
    use serde_json::json;

    fn fields(value: Value) -> ToolCallFields {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_meta_name_wins() {
        let f = fields(json!({
            "toolCallId": "c1",
            "title": "Find the config loader",
            "kind": "think",
            "_meta": {"claudeCode": {"toolName": "Task"}}
        }));
        assert_eq!(derive_tool_name(&f), "Task");
    }

    #[test]
    fn test_kind_mapping_before_title() {
        let f = fields(json!({"toolCallId": "c1", "title": "`cargo fmt`", "kind": "execute"}));
        assert_eq!(derive_tool_name(&f), "Bash");
    }

    #[test]
    fn test_fallback_chain() {
        let f = fields(json!({"toolCallId": "c1", "title": "  list_issues  ", "kind": "other"}));
        assert_eq!(derive_tool_name(&f), "list_issues");

        let f = fields(json!({"toolCallId": "c1", "kind": "other", "rawInput": {"tool": "query"}}));
        assert_eq!(derive_tool_name(&f), "query");

        let f = fields(json!({"toolCallId": "c1", "kind": "other"}));
        assert_eq!(derive_tool_name(&f), "other");

        let f = fields(json!({"toolCallId": "c1"}));
        assert_eq!(derive_tool_name(&f), "Tool");
    }

    #[test]
    fn test_read_input_takes_path_from_locations() {
        let f = fields(json!({
            "toolCallId": "c1",
            "kind": "read",
            "locations": [{"path": "/repo/src/main.rs"}],
            "rawInput": {"limit": 10}
        }));
        let input = derive_tool_input("Read", &f, &NormalizeOptions::default());

        assert_eq!(input.kind(), ToolKind::Read);
        assert_eq!(input.summary(), Some("/repo/src/main.rs"));
    }

    #[test]
    fn test_tool_output_prefers_content() {
        let f = fields(json!({
            "toolCallId": "c1",
            "content": [
                {"type": "content", "content": {"type": "text", "text": "line 1"}},
                {"type": "diff", "path": "a.rs", "oldText": "x", "newText": "y"},
                {"type": "terminal", "terminalId": "t1"}
            ],
            "rawOutput": "ignored"
        }));
        assert_eq!(tool_output(&f).as_deref(), Some("line 1\nUpdated a.rs"));
    }

    #[test]
    fn test_tool_output_from_raw_output() {
        let f = fields(json!({"toolCallId": "c1", "rawOutput": {"stdout": "ok", "exit_code": 0}}));
        assert_eq!(tool_output(&f).as_deref(), Some("ok"));

        let f = fields(json!({"toolCallId": "c1", "rawOutput": {"exit_code": 1}}));
        assert_eq!(tool_output(&f).as_deref(), Some(r#"{"exit_code":1}"#));

        let f = fields(json!({"toolCallId": "c1", "status": "in_progress"}));
        assert_eq!(tool_output(&f), None);
    }
}
