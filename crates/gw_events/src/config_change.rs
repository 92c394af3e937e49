use std::sync::Mutex;

use gw_core::ConfigChangeEvent;

type Listener = Box<dyn Fn(&ConfigChangeEvent) + Send + Sync>;

/// The manager's own `on("configChange", listener)` surface (spec §4.4,
/// §6) — distinct from the process-wide bus. Listeners are invoked
/// synchronously, in registration order, immediately after the mutation
/// that triggered them.
#[derive(Default)]
pub struct ConfigChangeListeners {
    listeners: Mutex<Vec<Listener>>,
}

impl ConfigChangeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_config_change<F>(&self, listener: F)
    where
        F: Fn(&ConfigChangeEvent) + Send + Sync + 'static,
    {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    pub fn notify(&self, event: &ConfigChangeEvent) {
        let listeners = self.listeners.lock().unwrap();
        tracing::debug!(kind = ?event.kind, listeners = listeners.len(), "configChange");
        for listener in listeners.iter() {
            listener(event);
        }
    }
}
