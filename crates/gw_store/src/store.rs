use async_trait::async_trait;

/// The persistent collection of endpoint URLs, canonical across restarts
/// (spec §6, consumed interface).
///
/// Implementations are treated by the manager as a single-writer serial
/// resource: the manager never interleaves two mutations against the same
/// store, but does not itself hold a lock across the store's own I/O —
/// implementers must either serialize internally or guarantee reentrancy
/// (spec §5).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// May fail; a failure here is treated conservatively as "the endpoint
    /// is already present" by `addEndpoint`'s duplicate check (spec
    /// §4.3.3) — fail-safe against duplication.
    async fn list_endpoints(&self) -> Result<Vec<String>, String>;

    /// Idempotent from the caller's perspective; may fail atomically.
    async fn add_endpoint(&self, endpoint: &str) -> Result<(), String>;

    /// Idempotent; may fail atomically.
    async fn remove_endpoint(&self, endpoint: &str) -> Result<(), String>;
}
