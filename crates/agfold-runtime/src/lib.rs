// Runtime layer: configuration and the event queue that feeds the engine

pub mod config;
pub mod dispatch;
pub mod error;

pub use config::{Config, resolve_config_path};
pub use dispatch::{Dispatcher, EventKind, EventQueue, InboundEvent};
pub use error::{Error, Result};
