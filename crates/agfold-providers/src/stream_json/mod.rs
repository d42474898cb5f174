// Turn-based stream-json protocol: discrete system / stream_event /
// assistant / user / result lines plus control requests.

pub mod normalize;
pub mod permission;
pub mod schema;
pub mod turn_error;

pub use normalize::{flatten_result_content, normalize_event};
pub use permission::normalize_permission_request;
pub use schema::StreamJsonEvent;
pub use turn_error::turn_error_message;

use crate::Result;

/// Parse one line of stream-json output
pub fn parse_line(line: &str) -> Result<StreamJsonEvent> {
    Ok(serde_json::from_str(line.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_trims_whitespace() {
        let event = parse_line("  {\"type\":\"stream_event\",\"event\":{\"type\":\"message_stop\"}}\n").unwrap();
        assert!(matches!(event, StreamJsonEvent::StreamEvent(_)));
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert!(matches!(parse_line("not json"), Err(crate::Error::Json(_))));
    }
}
