//! A scriptable [`ProxyConnection`] fake for exercising the lifecycle
//! controller without a real upstream socket.
//!
//! Gated behind the `test-util` feature, mirroring `tokio`'s own
//! `test-util` convention for non-production helpers that still need to
//! live outside `#[cfg(test)]` so other crates' test suites can depend on
//! them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::proxy::ProxyConnection;
use crate::tool::ToolProvider;

/// What a single `connect()` call on a [`FakeProxy`] should do.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    Succeed,
    Fail(String),
}

pub struct FakeProxy {
    script: Mutex<Vec<ConnectScript>>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    provider: Mutex<Option<Arc<dyn ToolProvider>>>,
}

impl FakeProxy {
    /// A proxy whose every `connect()` call succeeds.
    pub fn always_succeeds() -> Self {
        Self::new(std::iter::repeat(ConnectScript::Succeed).take(1024).collect())
    }

    /// A proxy whose every `connect()` call fails with `reason`.
    pub fn always_fails(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            std::iter::repeat_with(|| ConnectScript::Fail(reason.clone()))
                .take(1024)
                .collect(),
        )
    }

    /// A proxy that replays `script` in order, one entry per `connect()`
    /// call, then errors if called more times than scripted.
    pub fn new(script: Vec<ConnectScript>) -> Self {
        Self {
            script: Mutex::new(script),
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            provider: Mutex::new(None),
        }
    }

    pub fn connect_call_count(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_call_count(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyConnection for FakeProxy {
    async fn connect(&self, _timeout: Duration) -> Result<(), String> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self.script.lock().await;
            if script.is_empty() {
                ConnectScript::Fail("fake proxy script exhausted".to_string())
            } else {
                script.remove(0)
            }
        };
        match next {
            ConnectScript::Succeed => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            ConnectScript::Fail(reason) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(reason)
            }
        }
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn set_tool_provider(&self, provider: Option<Arc<dyn ToolProvider>>) {
        *self.provider.lock().await = provider;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
