use std::collections::HashMap;
use std::sync::Arc;

use gw_core::{ConnectionState, EndpointUrl};
use gw_proxy::ProxyConnection;

use crate::scheduled_task::ScheduledTask;

/// One row of the connection registry (spec §4.2): a compound record
/// carrying the proxy, its lifecycle state, and an optional reconnect
/// timer — a single map, not parallel lists, per the §9 redesign note.
pub struct RegistryEntry {
    pub proxy: Arc<dyn ProxyConnection>,
    pub state: ConnectionState,
    pub reconnect_task: Option<ScheduledTask>,
}

impl RegistryEntry {
    pub fn new(proxy: Arc<dyn ProxyConnection>, state: ConnectionState) -> Self {
        Self { proxy, state, reconnect_task: None }
    }

    /// Cancel and drop any pending reconnect timer.
    pub fn cancel_reconnect(&mut self) {
        if let Some(task) = self.reconnect_task.take() {
            task.cancel();
        }
    }
}

/// `{endpoint -> (ProxyConnection, ConnectionState, reconnectTimerHandle?)}`
/// (spec §4.2), guarded by the single `tokio::sync::Mutex` the lifecycle
/// controller owns.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<EndpointUrl, RegistryEntry>,
}

impl Registry {
    pub fn get(&self, endpoint: &EndpointUrl) -> Option<&RegistryEntry> {
        self.entries.get(endpoint)
    }

    pub fn get_mut(&mut self, endpoint: &EndpointUrl) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(endpoint)
    }

    pub fn contains(&self, endpoint: &EndpointUrl) -> bool {
        self.entries.contains_key(endpoint)
    }

    pub fn insert(&mut self, endpoint: EndpointUrl, entry: RegistryEntry) {
        self.entries.insert(endpoint, entry);
    }

    pub fn remove(&mut self, endpoint: &EndpointUrl) -> Option<RegistryEntry> {
        self.entries.remove(endpoint)
    }

    /// `getEndpoints()` (spec §4.2): the union of keys. A single map makes
    /// the union trivial — there are no parallel maps to drift apart.
    pub fn endpoints(&self) -> Vec<EndpointUrl> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> Vec<(EndpointUrl, RegistryEntry)> {
        self.entries.drain().collect()
    }
}
