use agfold_providers::acp::{self, PermissionRpcRequest, SessionUpdate};
use agfold_providers::stream_json::{self, StreamJsonEvent};
use agfold_providers::NormalizeOptions;
use agfold_types::{
    ImageAttachment, MessageBody, PendingPermission, PermissionRequest, RawPermission,
    TranscriptMessage, TranscriptOp, UserMessage,
};

use crate::apply::{Effect, Effects, apply_op, set_processing};
use crate::state::SessionState;
use crate::store::SessionStore;
use crate::tracker;

pub type ProcessingCallback = Box<dyn FnMut(&str, bool) + Send>;
pub type PermissionCallback = Box<dyn FnMut(&str, &PermissionRequest) + Send>;

/// Folds agent events from any number of sessions into per-session transcripts.
///
/// Ingestion never fails: unknown shapes and unmatched correlation ids leave
/// the session unchanged. Callbacks run synchronously inside the call that
/// caused them.
#[derive(Default)]
pub struct Engine {
    store: SessionStore,
    options: NormalizeOptions,
    on_processing_change: Option<ProcessingCallback>,
    on_permission_request: Option<PermissionCallback>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NormalizeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Called with `(session_id, is_processing)` whenever processing starts or stops
    pub fn on_processing_change<F>(&mut self, callback: F)
    where
        F: FnMut(&str, bool) + Send + 'static,
    {
        self.on_processing_change = Some(Box::new(callback));
    }

    /// Called with `(session_id, request)` whenever a permission request arrives
    pub fn on_permission_request<F>(&mut self, callback: F)
    where
        F: FnMut(&str, &PermissionRequest) + Send + 'static,
    {
        self.on_permission_request = Some(Box::new(callback));
    }

    // --- ingestion ---

    pub fn ingest_stream_json(&mut self, session_id: &str, event: &StreamJsonEvent) {
        let ops = stream_json::normalize_event(event, &self.options);
        self.apply_ops(session_id, ops);
    }

    pub fn ingest_acp(&mut self, session_id: &str, update: &SessionUpdate) {
        let ops = acp::normalize_update(update, &self.options);
        self.apply_ops(session_id, ops);
    }

    pub fn ingest_acp_permission(&mut self, session_id: &str, request: &PermissionRpcRequest) {
        let pending = acp::normalize_permission_request(request, &self.options);
        self.apply_ops(session_id, vec![TranscriptOp::PermissionRequested(pending)]);
    }

    /// The agent answered `session/prompt`: the ACP turn is over
    pub fn complete_acp_turn(&mut self, session_id: &str) {
        self.apply_ops(session_id, acp::complete_turn_ops());
    }

    /// Apply already-normalized ops to a session, creating it if needed.
    pub fn apply_ops(&mut self, session_id: &str, ops: Vec<TranscriptOp>) {
        let mut effects = Effects::default();
        let state = self.store.get_or_create(session_id);
        // Any event proves the agent process is alive
        state.is_connected = true;
        for op in ops {
            apply_op(state, op, &mut effects);
        }
        self.notify(session_id, effects);
    }

    /// Record the user's prompt and mark the session busy.
    pub fn begin_turn(&mut self, session_id: &str, text: &str, images: Vec<ImageAttachment>) {
        let mut effects = Effects::default();
        let state = self.store.get_or_create(session_id);
        state
            .messages
            .push(TranscriptMessage::new(MessageBody::User(UserMessage {
                text: text.to_string(),
                images,
            })));
        set_processing(state, true, &mut effects);
        self.notify(session_id, effects);
    }

    // --- permissions ---

    pub fn set_permission(
        &mut self,
        session_id: &str,
        request: PermissionRequest,
        raw: Option<RawPermission>,
    ) {
        let mut effects = Effects::default();
        let state = self.store.get_or_create(session_id);
        // Only a live agent can ask
        state.is_connected = true;
        tracker::set_permission(state, PendingPermission { request, raw }, &mut effects);
        self.notify(session_id, effects);
    }

    /// Remove and return the pending request so it can be answered
    pub fn take_permission(&mut self, session_id: &str) -> Option<PendingPermission> {
        self.store.get_mut(session_id).and_then(tracker::take_permission)
    }

    pub fn cancel_permission(&mut self, session_id: &str, request_id: &str) -> bool {
        self.store
            .get_mut(session_id)
            .is_some_and(|state| tracker::cancel_permission(state, request_id))
    }

    // --- store ---

    pub fn snapshot(&self, session_id: &str) -> Option<SessionState> {
        self.store.snapshot(session_id)
    }

    pub fn consume(&mut self, session_id: &str) -> Option<SessionState> {
        self.store.consume(session_id)
    }

    pub fn seed(&mut self, session_id: &str, state: SessionState) {
        self.store.seed(session_id, state);
    }

    pub fn has(&self, session_id: &str) -> bool {
        self.store.has(session_id)
    }

    pub fn delete(&mut self, session_id: &str) -> bool {
        self.store.delete(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.store.session_ids()
    }

    /// The agent process exited: freeze whatever was in flight.
    pub fn mark_disconnected(&mut self, session_id: &str) {
        if self.store.mark_disconnected(session_id) {
            let mut effects = Effects::default();
            effects.push(Effect::Processing(false));
            self.notify(session_id, effects);
        }
    }

    fn notify(&mut self, session_id: &str, effects: Effects) {
        if effects.is_empty() {
            return;
        }
        for effect in effects.into_vec() {
            match effect {
                Effect::Processing(value) => {
                    if let Some(callback) = self.on_processing_change.as_mut() {
                        callback(session_id, value);
                    }
                }
                Effect::Permission(request) => {
                    if let Some(callback) = self.on_permission_request.as_mut() {
                        callback(session_id, &request);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
