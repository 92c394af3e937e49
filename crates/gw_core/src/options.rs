use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Manager-wide tunables (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Delay, in milliseconds, before a scheduled reconnect fires. Default 5000, minimum 100.
    pub reconnect_interval_ms: u64,
    /// Reconnect ceiling per endpoint. Default 3, minimum 0.
    pub max_reconnect_attempts: u32,
    /// Bound, in milliseconds, on a single connect attempt. Default 10000, minimum 1000.
    pub connection_timeout_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 3,
            connection_timeout_ms: 10_000,
        }
    }
}

impl Options {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Validate this bag in full against the §3 constraint table, returning
    /// every violation rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        if self.reconnect_interval_ms < 100 {
            violations.push(format!(
                "reconnectInterval must be >= 100ms, got {}",
                self.reconnect_interval_ms
            ));
        }
        if self.connection_timeout_ms < 1_000 {
            violations.push(format!(
                "connectionTimeout must be >= 1000ms, got {}",
                self.connection_timeout_ms
            ));
        }
        // max_reconnect_attempts is a u32, so "<= 0" is unreachable as a type
        // constraint; the >= 0 bound from spec §3 is satisfied by construction.
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Apply a validated partial patch, returning the updated bag.
    pub fn with_patch(mut self, patch: &OptionsPatch) -> Self {
        if let Some(v) = patch.reconnect_interval_ms {
            self.reconnect_interval_ms = v;
        }
        if let Some(v) = patch.max_reconnect_attempts {
            self.max_reconnect_attempts = v;
        }
        if let Some(v) = patch.connection_timeout_ms {
            self.connection_timeout_ms = v;
        }
        self
    }
}

/// A partial update to [`Options`] (spec §4.3.9 `updateOptions`).
///
/// Only the fields present are changed; everything else is left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPatch {
    pub reconnect_interval_ms: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    pub connection_timeout_ms: Option<u64>,
}

const KNOWN_KEYS: &[&str] = &["reconnectInterval", "maxReconnectAttempts", "connectionTimeout"];

/// Parse and validate a raw JSON option bag into an [`OptionsPatch`].
///
/// Implements the "strict schema, unknown keys rejected, full violation list"
/// design note from spec §4.6/§9: dynamic option bags are never trusted
/// as-is, they are parsed through this gate before `updateOptions` applies
/// them to the live [`Options`].
pub fn parse_options_patch(raw: &serde_json::Value) -> Result<OptionsPatch, Vec<String>> {
    let mut violations = Vec::new();

    let map = match raw.as_object() {
        Some(m) => m,
        None => {
            return Err(vec!["options patch must be a JSON object".to_string()]);
        }
    };

    for key in map.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            violations.push(format!("unknown option key {key:?}"));
        }
    }

    let reconnect_interval_ms = match map.get("reconnectInterval") {
        None => None,
        Some(v) => match v.as_u64() {
            Some(n) if n >= 100 => Some(n),
            Some(n) => {
                violations.push(format!("reconnectInterval must be >= 100ms, got {n}"));
                None
            }
            None => {
                violations.push("reconnectInterval must be a non-negative integer".to_string());
                None
            }
        },
    };

    let max_reconnect_attempts = match map.get("maxReconnectAttempts") {
        None => None,
        Some(v) => match v.as_u64() {
            Some(n) => Some(n as u32),
            None => {
                violations.push("maxReconnectAttempts must be a non-negative integer".to_string());
                None
            }
        },
    };

    let connection_timeout_ms = match map.get("connectionTimeout") {
        None => None,
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1_000 => Some(n),
            Some(n) => {
                violations.push(format!("connectionTimeout must be >= 1000ms, got {n}"));
                None
            }
            None => {
                violations.push("connectionTimeout must be a non-negative integer".to_string());
                None
            }
        },
    };

    if violations.is_empty() {
        Ok(OptionsPatch {
            reconnect_interval_ms,
            max_reconnect_attempts,
            connection_timeout_ms,
        })
    } else {
        Err(violations)
    }
}
