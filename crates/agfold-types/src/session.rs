use serde::{Deserialize, Serialize};

/// Which wire protocol a session speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// Turn-based stream-json protocol (discrete message/result events)
    StreamJson,
    /// Agent Client Protocol (incremental session updates)
    Acp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::StreamJson => "stream-json",
            Protocol::Acp => "acp",
        }
    }
}

/// Facts announced once at session start; replaced wholesale on restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Session id as reported by the agent itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}
