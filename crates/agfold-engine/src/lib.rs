// Engine layer: applies normalized transcript ops to per-session state.
// Protocol parsing lives in agfold-providers; this crate only accumulates.

mod apply;
mod engine;
mod nesting;
mod state;
mod store;
mod tracker;

pub use engine::{Engine, PermissionCallback, ProcessingCallback};
pub use state::SessionState;
pub use store::SessionStore;
