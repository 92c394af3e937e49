use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operation a status event reports on (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Connect,
    Disconnect,
    Reconnect,
}

/// Published on the process-wide bus as `endpoint:status:changed` (spec §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStatusEvent {
    pub endpoint: String,
    pub connected: bool,
    pub operation: Operation,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub source: &'static str,
}

impl EndpointStatusEvent {
    pub fn new(
        endpoint: impl Into<String>,
        connected: bool,
        operation: Operation,
        success: bool,
        message: Option<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            connected,
            operation,
            success,
            message,
            timestamp: Utc::now().timestamp_millis(),
            source: "connection-manager",
        }
    }
}

/// The kind of bulk configuration change a `ConfigChangeEvent` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigChangeKind {
    EndpointsAdded { endpoints: Vec<String> },
    EndpointsRemoved { endpoints: Vec<String> },
    EndpointsUpdated { added: Vec<String>, removed: Vec<String> },
    OptionsUpdated {
        old: crate::options::Options,
        new: crate::options::Options,
    },
}

/// Emitted on the manager's own `configChange` listener surface (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    #[serde(flatten)]
    pub kind: ConfigChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ConfigChangeEvent {
    pub fn new(kind: ConfigChangeKind) -> Self {
        Self { kind, timestamp: Utc::now() }
    }
}
