use tokio::task::JoinHandle;

/// Wraps a spawned timer as an opaque, cancellable handle (spec §9's
/// "timer handles held as opaque platform values" re-architecture note).
///
/// Nothing outside this module inspects the underlying `JoinHandle` —
/// `gw_manager` is free to move to a different scheduler (a wheel, a
/// threaded runtime) without the rest of the crate noticing.
#[derive(Debug)]
pub struct ScheduledTask(JoinHandle<()>);

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }

    /// Cancel the task. A no-op if it already completed.
    pub fn cancel(self) {
        self.0.abort();
    }
}
