use chrono::{DateTime, Utc};

use crate::endpoint::EndpointUrl;
use crate::options::Options;

/// Per-endpoint lifecycle state (spec §3).
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Immutable after creation.
    pub endpoint: EndpointUrl,
    /// True only after `connect` returns successfully and until a
    /// disconnect or reconnect-attempt starts.
    pub connected: bool,
    /// Mirrors `connected` in the current design: tracks whether the MCP
    /// handshake completed.
    pub initialized: bool,
    /// Monotonically increasing count of failed attempts since the last
    /// success; reset to 0 on success.
    pub reconnect_attempts: u32,
    /// True while a reconnect attempt is in flight or scheduled.
    pub is_reconnecting: bool,
    pub last_connected: Option<DateTime<Utc>>,
    pub last_reconnect_attempt: Option<DateTime<Utc>>,
    /// Message of the last connect/reconnect failure, or empty on success.
    pub last_error: String,
    /// Delay that will be used for the next scheduled reconnect.
    ///
    /// Stored but, per spec §9's open question, not read by the scheduler —
    /// the scheduler uses `options.reconnect_interval` directly. Retained
    /// for a future adaptive-backoff strategy.
    pub reconnect_delay_ms: u64,
}

impl ConnectionState {
    /// The default state installed for a freshly-created registry entry,
    /// before any connect attempt.
    pub fn fresh(endpoint: EndpointUrl, options: &Options) -> Self {
        Self {
            endpoint,
            connected: false,
            initialized: false,
            reconnect_attempts: 0,
            is_reconnecting: false,
            last_connected: None,
            last_reconnect_attempt: None,
            last_error: String::new(),
            reconnect_delay_ms: options.reconnect_interval_ms,
        }
    }

    pub fn mark_connected(&mut self, now: DateTime<Utc>) {
        self.connected = true;
        self.initialized = true;
        self.is_reconnecting = false;
        self.reconnect_attempts = 0;
        self.last_connected = Some(now);
        self.last_error.clear();
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.initialized = false;
        self.is_reconnecting = false;
    }

    pub fn mark_connect_failed(&mut self, reason: &str) {
        self.connected = false;
        self.initialized = false;
        self.last_error = reason.to_string();
    }

    pub fn begin_reconnect_attempt(&mut self, now: DateTime<Utc>) {
        self.is_reconnecting = true;
        self.last_reconnect_attempt = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_endpoint;

    fn endpoint() -> EndpointUrl {
        validate_endpoint("wss://example.test/mcp").unwrap()
    }

    #[test]
    fn fresh_state_is_disconnected() {
        let st = ConnectionState::fresh(endpoint(), &Options::default());
        assert!(!st.connected);
        assert!(!st.is_reconnecting);
        assert_eq!(st.reconnect_attempts, 0);
        assert_eq!(st.reconnect_delay_ms, Options::default().reconnect_interval_ms);
    }

    #[test]
    fn connected_implies_not_reconnecting_and_zero_attempts() {
        let mut st = ConnectionState::fresh(endpoint(), &Options::default());
        st.reconnect_attempts = 2;
        st.is_reconnecting = true;
        st.mark_connected(Utc::now());
        assert!(st.connected);
        assert!(!st.is_reconnecting);
        assert_eq!(st.reconnect_attempts, 0);
        assert!(st.last_error.is_empty());
    }
}
