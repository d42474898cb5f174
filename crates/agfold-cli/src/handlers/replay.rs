use crate::types::ProtocolArg;
use agfold_engine::Engine;
use agfold_runtime::{Config, Dispatcher, EventKind, InboundEvent};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::path::Path;

/// Session id used when the capture does not name one
pub const DEFAULT_SESSION: &str = "replay";

pub fn handle(
    config: &Config,
    file: &Path,
    protocol: ProtocolArg,
    session: Option<&str>,
    disconnect: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let dispatcher = replay(config, &content, protocol, session, disconnect)?;
    let engine = dispatcher.engine();

    let output = match session {
        Some(id) => {
            let Some(state) = engine.snapshot(id) else {
                bail!("Session '{}' not found in capture", id);
            };
            serde_json::to_value(state)?
        }
        None => {
            let mut sessions = Map::new();
            for id in engine.session_ids() {
                if let Some(state) = engine.snapshot(&id) {
                    sessions.insert(id, serde_json::to_value(state)?);
                }
            }
            Value::Object(sessions)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Feed every line of `content` through a fresh dispatcher
pub fn replay(
    config: &Config,
    content: &str,
    protocol: ProtocolArg,
    session: Option<&str>,
    disconnect: bool,
) -> Result<Dispatcher> {
    let mut engine = Engine::with_options(config.engine.clone());
    engine.on_processing_change(|id, processing| {
        tracing::info!(session = id, processing, "processing changed");
    });
    engine.on_permission_request(|id, request| {
        tracing::info!(
            session = id,
            request_id = %request.request_id,
            tool = %request.tool_name,
            "permission requested"
        );
    });

    let mut dispatcher = Dispatcher::new(engine);
    let queue = dispatcher.queue();
    let default_session = session.unwrap_or(DEFAULT_SESSION);
    // Stream-json events without an id belong to the last session named
    let mut current_session = default_session.to_string();

    let mut skipped = 0usize;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let parsed = match (protocol, session) {
            (ProtocolArg::StreamJson, Some(forced)) => {
                InboundEvent::from_stream_json_line(forced, line).map(Some)
            }
            (ProtocolArg::StreamJson, None) => {
                InboundEvent::from_stream_json_line_routed(&current_session, line).map(Some)
            }
            (ProtocolArg::Acp, _) => InboundEvent::from_acp_line(default_session, line),
        };

        match parsed {
            Ok(Some(event)) => {
                if protocol == ProtocolArg::StreamJson {
                    current_session.clone_from(&event.session_id);
                }
                queue.send(event)?
            }
            Ok(None) => {
                tracing::debug!(line = index + 1, "line carries no transcript event");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(line = index + 1, error = %e, "skipping unparsable line");
            }
        }
    }

    let applied = dispatcher.pump();
    tracing::info!(applied, skipped, "replay finished");

    if disconnect {
        for id in dispatcher.engine().session_ids() {
            dispatcher.dispatch(InboundEvent::new(id, EventKind::Disconnected));
        }
    }

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{"type":"system","subtype":"init","session_id":"abc","model":"claude-sonnet","cwd":"/tmp","tools":["Bash"]}
{"type":"stream_event","event":{"type":"message_start","message":{}}}
{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}}
not json at all
{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}}
{"type":"assistant","message":{"id":"m1","content":[{"type":"text","text":"Hello"}]}}
{"type":"result","subtype":"success","is_error":false,"total_cost_usd":0.01}
"#;

    #[test]
    fn test_replay_skips_bad_lines() -> Result<()> {
        let dispatcher = replay(
            &Config::default(),
            STREAM,
            ProtocolArg::StreamJson,
            None,
            false,
        )?;

        let state = dispatcher
            .engine()
            .snapshot("abc")
            .context("session missing")?;
        assert_eq!(state.messages.len(), 1);
        assert_eq!(
            state.messages[0].as_assistant().map(|m| m.text.as_str()),
            Some("Hello")
        );
        assert!(!state.is_processing);
        assert!((state.total_cost - 0.01).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_replay_routes_interleaved_sessions() -> Result<()> {
        let capture = r#"{"type":"stream_event","event":{"type":"message_start","message":{}}}
{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"orphan"}}}
{"type":"system","subtype":"init","session_id":"a","model":"m"}
{"type":"system","subtype":"init","session_id":"b","model":"m"}
{"type":"assistant","session_id":"a","message":{"content":[{"type":"text","text":"from a"}]}}
{"type":"control_request","request_id":"r1","request":{"subtype":"can_use_tool","tool_name":"Bash","input":{"command":"ls"}}}
{"type":"assistant","session_id":"b","message":{"content":[{"type":"text","text":"from b"}]}}
"#;
        let dispatcher = replay(
            &Config::default(),
            capture,
            ProtocolArg::StreamJson,
            None,
            false,
        )?;
        let engine = dispatcher.engine();

        let mut ids = engine.session_ids();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", DEFAULT_SESSION]);

        let text = |id: &str| -> Result<Vec<String>> {
            let state = engine.snapshot(id).context("session missing")?;
            Ok(state
                .messages
                .iter()
                .filter_map(|m| m.as_assistant().map(|a| a.text.clone()))
                .collect())
        };
        assert_eq!(text(DEFAULT_SESSION)?, vec!["orphan"]);
        assert_eq!(text("a")?, vec!["from a"]);
        assert_eq!(text("b")?, vec!["from b"]);

        // The control request names no session and lands in the last one seen
        let a = engine.snapshot("a").context("session missing")?;
        let pending = a.pending_permission.context("permission missing")?;
        assert_eq!(pending.request.tool_name, "Bash");
        assert!(engine.snapshot("b").context("session missing")?.pending_permission.is_none());
        Ok(())
    }

    #[test]
    fn test_replay_disconnect_at_eof() -> Result<()> {
        let capture = r#"{"type":"system","subtype":"init","session_id":"abc"}"#;
        let dispatcher = replay(
            &Config::default(),
            capture,
            ProtocolArg::StreamJson,
            Some("s1"),
            true,
        )?;

        let state = dispatcher.engine().snapshot("s1").context("session missing")?;
        assert!(!state.is_connected);
        assert!(!state.is_processing);
        Ok(())
    }
}
