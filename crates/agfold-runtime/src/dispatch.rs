// Single-threaded dispatch: transports push events from any thread, the
// owning thread drains them into the engine one at a time.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::time::Duration;

use agfold_engine::Engine;
use agfold_providers::acp::{self, AcpMessage, PermissionRpcRequest, SessionUpdate};
use agfold_providers::stream_json::{self, StreamJsonEvent};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub enum EventKind {
    StreamJson(StreamJsonEvent),
    AcpUpdate(SessionUpdate),
    AcpPermission(PermissionRpcRequest),
    AcpTurnComplete,
    /// The agent process exited
    Disconnected,
}

/// One event addressed to a session.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub session_id: String,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(session_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }

    pub fn from_stream_json_line(session_id: &str, line: &str) -> Result<Self> {
        let event = stream_json::parse_line(line)?;
        Ok(Self::new(session_id, EventKind::StreamJson(event)))
    }

    /// Parse one stream-json line, addressing it to the session the event
    /// names and falling back to `default_session` for events without one.
    pub fn from_stream_json_line_routed(default_session: &str, line: &str) -> Result<Self> {
        let event = stream_json::parse_line(line)?;
        let session_id = event.session_id().unwrap_or(default_session).to_string();
        Ok(Self::new(session_id, EventKind::StreamJson(event)))
    }

    /// Classify one ACP line.
    ///
    /// Notifications carry their own session id; `default_session` is used
    /// for bare updates and prompt responses. Lines that do not concern the
    /// transcript yield `None`.
    pub fn from_acp_line(default_session: &str, line: &str) -> Result<Option<Self>> {
        let event = match acp::parse_message(line)? {
            AcpMessage::Update(notification) => Self::new(
                notification
                    .session_id
                    .unwrap_or_else(|| default_session.to_string()),
                EventKind::AcpUpdate(notification.update),
            ),
            AcpMessage::PermissionRequest(request) => Self::new(
                request
                    .params
                    .session_id
                    .clone()
                    .unwrap_or_else(|| default_session.to_string()),
                EventKind::AcpPermission(request),
            ),
            AcpMessage::TurnComplete { .. } => {
                Self::new(default_session, EventKind::AcpTurnComplete)
            }
            AcpMessage::Other => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Cloneable handle for pushing events into a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: Sender<InboundEvent>,
}

impl EventQueue {
    pub fn send(&self, event: InboundEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::QueueClosed)
    }
}

/// Owns the engine and applies queued events in arrival order.
pub struct Dispatcher {
    engine: Engine,
    tx: Sender<InboundEvent>,
    rx: Receiver<InboundEvent>,
}

impl Dispatcher {
    pub fn new(engine: Engine) -> Self {
        let (tx, rx) = channel();
        Self { engine, tx, rx }
    }

    pub fn queue(&self) -> EventQueue {
        EventQueue {
            tx: self.tx.clone(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Apply one event to the engine
    pub fn dispatch(&mut self, event: InboundEvent) {
        let session_id = event.session_id.as_str();
        match &event.kind {
            EventKind::StreamJson(e) => self.engine.ingest_stream_json(session_id, e),
            EventKind::AcpUpdate(update) => self.engine.ingest_acp(session_id, update),
            EventKind::AcpPermission(request) => {
                self.engine.ingest_acp_permission(session_id, request)
            }
            EventKind::AcpTurnComplete => self.engine.complete_acp_turn(session_id),
            EventKind::Disconnected => self.engine.mark_disconnected(session_id),
        }
    }

    /// Drain everything queued so far; returns the number of events applied
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Wait up to `timeout` for the first event, then drain the rest
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                self.dispatch(event);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_events_from_other_threads_apply_in_order() {
        let mut dispatcher = Dispatcher::new(Engine::new());
        let queue = dispatcher.queue();

        let handle = thread::spawn(move || {
            for line in [
                r#"{"type":"stream_event","event":{"type":"message_start","message":{}}}"#,
                r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"a"}}}"#,
                r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"b"}}}"#,
            ] {
                queue
                    .send(InboundEvent::from_stream_json_line("s1", line).unwrap())
                    .unwrap();
            }
        });
        handle.join().unwrap();

        assert_eq!(dispatcher.pump(), 3);
        let state = dispatcher.engine().snapshot("s1").unwrap();
        assert_eq!(state.messages[0].as_assistant().unwrap().text, "ab");
        assert_eq!(dispatcher.pump(), 0);
    }

    #[test]
    fn test_acp_lines_route_by_session() {
        let event = InboundEvent::from_acp_line(
            "fallback",
            r#"{"jsonrpc":"2.0","method":"session/update","params":{"sessionId":"sess_9","update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"hi"}}}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.session_id, "sess_9");

        let event = InboundEvent::from_acp_line(
            "fallback",
            r#"{"jsonrpc":"2.0","id":2,"result":{"stopReason":"end_turn"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.session_id, "fallback");
        assert!(matches!(event.kind, EventKind::AcpTurnComplete));

        assert!(
            InboundEvent::from_acp_line("fallback", r#"{"jsonrpc":"2.0","id":0,"result":{}}"#)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_stream_json_lines_route_by_session() {
        let event = InboundEvent::from_stream_json_line_routed(
            "fallback",
            r#"{"type":"system","subtype":"init","session_id":"abc"}"#,
        )
        .unwrap();
        assert_eq!(event.session_id, "abc");

        let event = InboundEvent::from_stream_json_line_routed(
            "fallback",
            r#"{"type":"stream_event","event":{"type":"message_start","message":{}}}"#,
        )
        .unwrap();
        assert_eq!(event.session_id, "fallback");

        // An explicit session wins over the event's own id
        let event = InboundEvent::from_stream_json_line(
            "forced",
            r#"{"type":"system","subtype":"init","session_id":"abc"}"#,
        )
        .unwrap();
        assert_eq!(event.session_id, "forced");
    }

    #[test]
    fn test_disconnect_event() {
        let mut dispatcher = Dispatcher::new(Engine::new());
        dispatcher.engine_mut().begin_turn("s1", "hi", Vec::new());

        let queue = dispatcher.queue();
        queue
            .send(InboundEvent::new("s1", EventKind::Disconnected))
            .unwrap();
        assert_eq!(dispatcher.pump_timeout(Duration::from_millis(10)), 1);

        let state = dispatcher.engine().snapshot("s1").unwrap();
        assert!(!state.is_processing);
        assert!(!state.is_connected);
    }
}
