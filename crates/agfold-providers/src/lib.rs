// Error types
pub mod error;

// Shared normalization knobs
pub mod options;

// Tool input normalization shared by both protocols
pub mod normalization;

// Protocol adapters
pub mod acp;
pub mod stream_json;

pub use error::{Error, Result};
pub use normalization::{normalize_tool_input, parse_mcp_name};
pub use options::NormalizeOptions;
