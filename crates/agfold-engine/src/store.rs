use std::collections::HashMap;

use crate::state::SessionState;

/// One state record per session id.
///
/// Records are created lazily by ingestion. The owner of the foreground
/// session moves records out with [`consume`](Self::consume) and back in
/// with [`seed`](Self::seed); readers get deep copies from
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_or_create(&mut self, session_id: &str) -> &mut SessionState {
        if !self.sessions.contains_key(session_id) {
            tracing::debug!(session_id, "creating session state");
        }
        self.sessions.entry(session_id.to_string()).or_default()
    }

    pub(crate) fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionState> {
        self.sessions.get_mut(session_id)
    }

    /// Independent copy of a session's state
    pub fn snapshot(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.get(session_id).cloned()
    }

    /// Move a session's state out of the store
    pub fn consume(&mut self, session_id: &str) -> Option<SessionState> {
        let state = self.sessions.remove(session_id);
        if state.is_some() {
            tracing::info!(session_id, "session moved to foreground");
        }
        state
    }

    /// Install state owned elsewhere as the background record.
    ///
    /// Nested-agent routing and the streaming pointer are rebuilt from the
    /// transcript, so accumulation continues where the other owner stopped.
    pub fn seed(&mut self, session_id: &str, mut state: SessionState) {
        state.rebuild_index();
        tracing::info!(
            session_id,
            messages = state.messages.len(),
            "session moved to background"
        );
        self.sessions.insert(session_id.to_string(), state);
    }

    pub fn has(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn delete(&mut self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::info!(session_id, "session deleted");
        }
        removed
    }

    /// Ids of all stored sessions, sorted
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Resolve everything a dead agent process left in flight.
    ///
    /// Returns `true` when `is_processing` went from true to false. Unknown
    /// ids are a no-op.
    pub fn mark_disconnected(&mut self, session_id: &str) -> bool {
        let Some(state) = self.sessions.get_mut(session_id) else {
            return false;
        };

        if state.is_connected {
            tracing::info!(session_id, "session disconnected");
        }
        state.is_connected = false;
        state.pending_permission = None;

        // An empty message that was still being written never gets content
        let current = state.streaming_id.take();
        state.messages.retain(|message| {
            let Some(assistant) = message.as_assistant() else {
                return true;
            };
            let in_flight =
                assistant.is_streaming || current.as_deref() == Some(message.id.as_str());
            !(in_flight && assistant.is_empty())
        });
        for message in &mut state.messages {
            if let Some(assistant) = message.as_assistant_mut()
                && assistant.is_streaming
            {
                assistant.finish();
            }
        }

        let was_processing = state.is_processing;
        state.is_processing = false;
        was_processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agfold_types::{MessageBody, TranscriptMessage, UserMessage};

    fn user(text: &str) -> TranscriptMessage {
        TranscriptMessage::new(MessageBody::User(UserMessage {
            text: text.to_string(),
            images: Vec::new(),
        }))
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut store = SessionStore::new();
        store.get_or_create("s1").messages.push(user("hi"));

        let mut snapshot = store.snapshot("s1").unwrap();
        snapshot.messages.clear();
        snapshot.total_cost = 9.0;

        let live = store.snapshot("s1").unwrap();
        assert_eq!(live.messages.len(), 1);
        assert_eq!(live.total_cost, 0.0);
        assert!(store.snapshot("missing").is_none());
    }

    #[test]
    fn test_consume_removes_entry() {
        let mut store = SessionStore::new();
        store.get_or_create("s1").messages.push(user("hi"));

        let state = store.consume("s1").unwrap();
        assert_eq!(state.messages.len(), 1);
        assert!(!store.has("s1"));
        assert!(store.consume("s1").is_none());
    }

    #[test]
    fn test_delete_and_ids() {
        let mut store = SessionStore::new();
        store.get_or_create("b");
        store.get_or_create("a");
        assert_eq!(store.session_ids(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_mark_disconnected_unknown_session() {
        let mut store = SessionStore::new();
        assert!(!store.mark_disconnected("nope"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_disconnected_drops_empty_streaming_message() {
        let mut store = SessionStore::new();
        let state = store.get_or_create("s1");
        state.messages.push(user("hi"));
        state.with_streaming_assistant(|_| {});
        assert_eq!(state.messages.len(), 2);

        assert!(!store.mark_disconnected("s1"));
        let state = store.snapshot("s1").unwrap();
        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].as_assistant().is_none());
        assert_eq!(state.streaming_message_id(), None);
    }
}
