use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::tool::ToolProvider;

/// Encapsulates a single upstream WebSocket session (spec §4.1).
///
/// The manager observes a proxy only through the return/throw of `connect`
/// — a proxy never emits events upward on its own. Implementations must
/// treat every method as safe to call regardless of current connection
/// state: `disconnect` is idempotent and infallible, `connect` may be
/// retried after a prior failure, and `set_tool_provider` may be called
/// before or after `connect`.
#[async_trait]
pub trait ProxyConnection: Send + Sync {
    /// Perform the TCP/WS handshake and the MCP initialization exchange,
    /// bounded by `timeout`. On failure returns the opaque reason string the
    /// manager records verbatim as `ConnectionState::last_error`.
    async fn connect(&self, timeout: Duration) -> Result<(), String>;

    /// Idempotent, synchronous from the caller's perspective, never fails
    /// observably.
    async fn disconnect(&self);

    /// Install or replace the tool provider answering upstream tool-list and
    /// tool-call requests.
    async fn set_tool_provider(&self, provider: Option<Arc<dyn ToolProvider>>);

    /// Snapshot of whether the session is currently live.
    fn is_connected(&self) -> bool;
}
