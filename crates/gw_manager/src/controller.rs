use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use gw_core::{
    validate_endpoint, ConfigChangeEvent, ConfigChangeKind, EndpointStatusEvent, EndpointUrl,
    GatewayError, Operation, Options, OptionsPatch,
};
use gw_events::{ConfigChangeListeners, EventBus};
use gw_proxy::{ProxyConnection, Tool, ToolProvider};
use gw_store::ConfigStore;

use crate::registry::{Registry, RegistryEntry};
use crate::scheduled_task::ScheduledTask;

/// Builds a fresh [`ProxyConnection`] for a given endpoint.
///
/// Injected rather than hard-coded to a concrete `WebSocketProxy`
/// constructor — spec §9's "pass dependencies in, do not consult a
/// process-global" note applies equally to this seam, and it is what lets
/// tests wire in `gw_proxy::testing::FakeProxy` instead of a real socket.
pub type ProxyFactory = Box<dyn Fn(&EndpointUrl) -> Arc<dyn ProxyConnection> + Send + Sync>;

/// Combined failure of [`ConnectionManager::reload_config`]: it composes
/// `updateOptions` (spec §4.3.9, a `Vec<String>` of violations) with
/// `updateEndpoints` (a [`GatewayError`]), and the two halves don't share
/// an error type.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadConfigError {
    Options(Vec<String>),
    Endpoints(GatewayError),
}

struct Inner {
    config_store: Arc<dyn ConfigStore>,
    event_bus: Arc<dyn EventBus>,
    config_change: ConfigChangeListeners,
    proxy_factory: ProxyFactory,
    registry: Mutex<Registry>,
    options: Mutex<Options>,
    tool_provider: Mutex<Option<Arc<dyn ToolProvider>>>,
    initialized: AtomicBool,
    connecting_all: AtomicBool,
}

/// The Lifecycle Controller (spec §4.3): the orchestrator tying the
/// configuration store, the connection registry, the proxy layer, and the
/// event publisher together. Cloning a `ConnectionManager` is cheap and
/// shares the same underlying state — clones are the intended way to hand
/// a handle to, say, a reconnect timer or a demo harness.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        event_bus: Arc<dyn EventBus>,
        proxy_factory: ProxyFactory,
    ) -> Self {
        Self::with_options(config_store, event_bus, proxy_factory, Options::default())
    }

    pub fn with_options(
        config_store: Arc<dyn ConfigStore>,
        event_bus: Arc<dyn EventBus>,
        proxy_factory: ProxyFactory,
        options: Options,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config_store,
                event_bus,
                config_change: ConfigChangeListeners::new(),
                proxy_factory,
                registry: Mutex::new(Registry::default()),
                options: Mutex::new(options),
                tool_provider: Mutex::new(None),
                initialized: AtomicBool::new(false),
                connecting_all: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub async fn options(&self) -> Options {
        *self.inner.options.lock().await
    }

    pub async fn get_endpoints(&self) -> Vec<EndpointUrl> {
        self.inner.registry.lock().await.endpoints()
    }

    /// A snapshot of one endpoint's state, for tests and introspection.
    pub async fn state_of(&self, endpoint: &EndpointUrl) -> Option<gw_core::ConnectionState> {
        self.inner.registry.lock().await.get(endpoint).map(|e| e.state.clone())
    }

    /// Whether a reconnect timer is currently pending for `endpoint`. Used
    /// to check the "at most one timer per endpoint" invariant (spec §8)
    /// without exposing the timer handle itself.
    pub async fn has_pending_reconnect(&self, endpoint: &EndpointUrl) -> bool {
        self.inner
            .registry
            .lock()
            .await
            .get(endpoint)
            .map(|e| e.reconnect_task.is_some())
            .unwrap_or(false)
    }

    pub fn on_config_change<F>(&self, listener: F)
    where
        F: Fn(&ConfigChangeEvent) + Send + Sync + 'static,
    {
        self.inner.config_change.on_config_change(listener);
    }

    /// §4.3.1 `initialize(endpoints, tools)`.
    pub async fn initialize(
        &self,
        endpoints: Vec<String>,
        tools: Vec<Tool>,
    ) -> Result<(), GatewayError> {
        let mut valid = Vec::with_capacity(endpoints.len());
        for raw in &endpoints {
            valid.push(validate_endpoint(raw)?);
        }

        self.cleanup().await;

        *self.inner.tool_provider.lock().await =
            Some(Arc::new(gw_proxy::StaticToolProvider::new(tools)) as Arc<dyn ToolProvider>);
        let provider = self.inner.tool_provider.lock().await.clone();

        let options = *self.inner.options.lock().await;
        let mut seen = std::collections::HashSet::new();
        for endpoint in valid {
            // initialize(["ws://x", "ws://x"], _) collapses to one entry (§8).
            if !seen.insert(endpoint.as_str().to_string()) {
                continue;
            }
            let proxy = (self.inner.proxy_factory)(&endpoint);
            if let Some(provider) = provider.clone() {
                proxy.set_tool_provider(Some(provider)).await;
            }
            let state = gw_core::ConnectionState::fresh(endpoint.clone(), &options);
            self.inner.registry.lock().await.insert(endpoint, RegistryEntry::new(proxy, state));
        }

        self.inner.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// §4.3.2 `connect-all`.
    pub async fn connect_all(&self) -> Result<(), GatewayError> {
        self.ensure_initialized()?;
        if self
            .inner
            .connecting_all
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Already mid connect-all; the §5 isConnecting flag makes this a no-op
            // rather than a second concurrent fan-out.
            return Ok(());
        }

        let endpoints = self.get_endpoints().await;
        let attempted = endpoints.len();
        let results = futures_util::future::join_all(
            endpoints.iter().map(|e| self.attempt_connect(e, Operation::Connect, false)),
        )
        .await;

        self.inner.connecting_all.store(false, Ordering::SeqCst);

        if attempted > 0 && results.iter().all(Result::is_err) {
            return Err(GatewayError::AllEndpointsFailed { attempted });
        }
        Ok(())
    }

    /// §4.3.3 `addEndpoint(endpoint)`.
    pub async fn add_endpoint(&self, endpoint: &str) -> Result<(), GatewayError> {
        self.ensure_initialized()?;
        let url = validate_endpoint(endpoint)?;

        if self.inner.registry.lock().await.contains(&url) {
            tracing::debug!(endpoint, "addEndpoint: already in registry, no-op");
            return Ok(());
        }

        match self.inner.config_store.list_endpoints().await {
            Ok(list) if list.iter().any(|e| e == endpoint) => {
                return Err(GatewayError::EndpointAlreadyInConfig(endpoint.to_string()));
            }
            Err(_) => {
                // fail-safe against duplication per §4.3.3.
                return Err(GatewayError::EndpointAlreadyInConfig(endpoint.to_string()));
            }
            Ok(_) => {}
        }

        self.inner
            .config_store
            .add_endpoint(endpoint)
            .await
            .map_err(GatewayError::ConfigStoreError)?;

        self.insert_fresh_entry(url.clone()).await;

        if let Err(err) = self.attempt_connect(&url, Operation::Connect, false).await {
            // Rollback: best-effort store removal, then erase the registry entry.
            if let Err(rollback_err) = self.inner.config_store.remove_endpoint(endpoint).await {
                tracing::warn!(endpoint, error = %rollback_err, "addEndpoint rollback: store removal failed");
            }
            let mut registry = self.inner.registry.lock().await;
            if let Some(mut entry) = registry.remove(&url) {
                entry.cancel_reconnect();
            }
            return Err(err);
        }

        Ok(())
    }

    /// §4.3.4 `removeEndpoint(endpoint)`.
    pub async fn remove_endpoint(&self, endpoint: &str) -> Result<(), GatewayError> {
        let Ok(url) = validate_endpoint(endpoint) else {
            return Ok(());
        };
        if !self.inner.registry.lock().await.contains(&url) {
            return Ok(());
        }

        self.inner
            .config_store
            .remove_endpoint(endpoint)
            .await
            .map_err(GatewayError::ConfigStoreError)?;

        let proxy = {
            let registry = self.inner.registry.lock().await;
            registry.get(&url).map(|entry| entry.proxy.clone())
        };
        let Some(proxy) = proxy else { return Ok(()) };
        proxy.disconnect().await;

        // Publish while the registry entry still exists (spec §5: "removeEndpoint
        // publishes its disconnect event before the registry entry disappears").
        self.inner.event_bus.publish(EndpointStatusEvent::new(
            endpoint,
            false,
            Operation::Disconnect,
            true,
            None,
        ));

        let mut registry = self.inner.registry.lock().await;
        if let Some(mut entry) = registry.remove(&url) {
            entry.cancel_reconnect();
        }
        Ok(())
    }

    /// §4.3.5 `connectEndpoint(endpoint)`.
    pub async fn connect_endpoint(&self, endpoint: &EndpointUrl) -> Result<(), GatewayError> {
        self.ensure_initialized()?;
        let already_connected = {
            let registry = self.inner.registry.lock().await;
            let entry = registry
                .get(endpoint)
                .ok_or_else(|| GatewayError::EndpointNotFound(endpoint.to_string()))?;
            entry.state.connected
        };
        if already_connected {
            return Ok(());
        }
        self.attempt_connect(endpoint, Operation::Connect, false).await
    }

    /// §4.3.6 `disconnectEndpoint(endpoint)`.
    pub async fn disconnect_endpoint(&self, endpoint: &EndpointUrl) {
        let proxy = {
            let registry = self.inner.registry.lock().await;
            match registry.get(endpoint) {
                Some(entry) if entry.state.connected => entry.proxy.clone(),
                _ => return,
            }
        };
        proxy.disconnect().await;

        {
            let mut registry = self.inner.registry.lock().await;
            if let Some(entry) = registry.get_mut(endpoint) {
                entry.state.mark_disconnected();
                entry.cancel_reconnect();
            }
        }

        self.inner.event_bus.publish(EndpointStatusEvent::new(
            endpoint.to_string(),
            false,
            Operation::Disconnect,
            true,
            None,
        ));
    }

    /// `[ADD]` standalone `disconnect_all()` (spec §2's "disconnect-all",
    /// and `cleanup`'s second step): drop every live session without
    /// touching the registry or the configuration store.
    pub async fn disconnect_all(&self) {
        let endpoints = self.get_endpoints().await;
        for endpoint in &endpoints {
            self.disconnect_endpoint(endpoint).await;
        }
    }

    /// §4.3.7 manual override: `triggerReconnect(endpoint)`.
    pub async fn trigger_reconnect(&self, endpoint: &EndpointUrl) -> Result<(), GatewayError> {
        self.stop_reconnect(endpoint).await;
        self.attempt_connect(endpoint, Operation::Reconnect, true).await
    }

    /// §4.3.7 manual override: `stopReconnect(endpoint)`.
    pub async fn stop_reconnect(&self, endpoint: &EndpointUrl) {
        let mut registry = self.inner.registry.lock().await;
        if let Some(entry) = registry.get_mut(endpoint) {
            entry.cancel_reconnect();
            entry.state.is_reconnecting = false;
        }
    }

    /// §4.3.7 manual override: `stopAllReconnects()`.
    pub async fn stop_all_reconnects(&self) {
        let mut registry = self.inner.registry.lock().await;
        for endpoint in registry.endpoints() {
            if let Some(entry) = registry.get_mut(&endpoint) {
                entry.cancel_reconnect();
                entry.state.is_reconnecting = false;
            }
        }
    }

    /// §4.3.8 `updateEndpoints(newEndpoints, tools)`.
    pub async fn update_endpoints(
        &self,
        new_endpoints: Vec<String>,
        tools: Vec<Tool>,
    ) -> Result<(), GatewayError> {
        let (valid, invalid) = gw_core::partition_endpoints(&new_endpoints);
        for (candidate, err) in &invalid {
            tracing::warn!(endpoint = %candidate, error = %err, "updateEndpoints: rejecting invalid endpoint");
        }
        if valid.is_empty() && !new_endpoints.is_empty() {
            return Err(GatewayError::InvalidEndpoint {
                endpoint: new_endpoints.join(", "),
                reason: "no valid endpoints in update".to_string(),
            });
        }

        if !tools.is_empty() {
            *self.inner.tool_provider.lock().await =
                Some(Arc::new(gw_proxy::StaticToolProvider::new(tools)) as Arc<dyn ToolProvider>);
        }

        let current: Vec<EndpointUrl> = self.get_endpoints().await;
        let new_set: std::collections::HashSet<&str> = valid.iter().map(|e| e.as_str()).collect();
        let current_set: std::collections::HashSet<&str> =
            current.iter().map(|e| e.as_str()).collect();

        let to_remove: Vec<String> = current
            .iter()
            .filter(|e| !new_set.contains(e.as_str()))
            .map(|e| e.to_string())
            .collect();
        let to_add: Vec<String> = valid
            .iter()
            .filter(|e| !current_set.contains(e.as_str()))
            .map(|e| e.to_string())
            .collect();

        for endpoint in &to_remove {
            if let Err(err) = self.remove_endpoint(endpoint).await {
                tracing::warn!(endpoint, error = %err, "updateEndpoints: removal failed, continuing");
            }
        }
        for endpoint in &to_add {
            if let Err(err) = self.add_endpoint(endpoint).await {
                tracing::warn!(endpoint, error = %err, "updateEndpoints: add failed, continuing");
            }
        }

        let kind = match (to_add.is_empty(), to_remove.is_empty()) {
            (false, false) => Some(ConfigChangeKind::EndpointsUpdated { added: to_add, removed: to_remove }),
            (false, true) => Some(ConfigChangeKind::EndpointsAdded { endpoints: to_add }),
            (true, false) => Some(ConfigChangeKind::EndpointsRemoved { endpoints: to_remove }),
            (true, true) => None,
        };
        if let Some(kind) = kind {
            self.inner.config_change.notify(&ConfigChangeEvent::new(kind));
        }

        Ok(())
    }

    /// §4.3.9 `updateOptions(newOptions)`.
    pub async fn update_options(&self, raw_patch: &serde_json::Value) -> Result<(), Vec<String>> {
        let patch: OptionsPatch = gw_core::parse_options_patch(raw_patch)?;
        let old = *self.inner.options.lock().await;
        let new = old.with_patch(&patch);
        new.validate()?;

        *self.inner.options.lock().await = new;
        self.inner.config_change.notify(&ConfigChangeEvent::new(ConfigChangeKind::OptionsUpdated {
            old,
            new,
        }));
        Ok(())
    }

    /// §4.3.9 `reloadConfig(config)`: composes `updateOptions` (if
    /// present) then `updateEndpoints` (if present).
    pub async fn reload_config(
        &self,
        options_patch: Option<serde_json::Value>,
        endpoints_update: Option<(Vec<String>, Vec<Tool>)>,
    ) -> Result<(), ReloadConfigError> {
        if let Some(patch) = options_patch {
            self.update_options(&patch).await.map_err(ReloadConfigError::Options)?;
        }
        if let Some((endpoints, tools)) = endpoints_update {
            self.update_endpoints(endpoints, tools)
                .await
                .map_err(ReloadConfigError::Endpoints)?;
        }
        Ok(())
    }

    /// §4.3.10 `cleanup`. Idempotent: `stopAllReconnects`, then
    /// `disconnect-all`, then drop every registry entry, then mark
    /// uninitialized.
    pub async fn cleanup(&self) {
        self.stop_all_reconnects().await;
        self.disconnect_all().await;
        let drained = {
            let mut registry = self.inner.registry.lock().await;
            registry.drain()
        };
        for (_, mut entry) in drained {
            entry.cancel_reconnect();
        }
        self.inner.initialized.store(false, Ordering::SeqCst);
    }

    /// Tool Sync (spec §4.5): install a new catalogue and push it to every
    /// live proxy; new proxies pick it up at creation time (see
    /// `insert_fresh_entry`).
    pub async fn set_tool_provider(&self, provider: Option<Arc<dyn ToolProvider>>) {
        *self.inner.tool_provider.lock().await = provider.clone();
        let proxies: Vec<Arc<dyn ProxyConnection>> = {
            let registry = self.inner.registry.lock().await;
            registry.endpoints().iter().filter_map(|e| registry.get(e).map(|entry| entry.proxy.clone())).collect()
        };
        for proxy in proxies {
            proxy.set_tool_provider(provider.clone()).await;
        }
    }

    fn ensure_initialized(&self) -> Result<(), GatewayError> {
        if self.inner.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::NotInitialized)
        }
    }

    async fn insert_fresh_entry(&self, endpoint: EndpointUrl) {
        let provider = self.inner.tool_provider.lock().await.clone();
        let proxy = (self.inner.proxy_factory)(&endpoint);
        if let Some(provider) = provider {
            proxy.set_tool_provider(Some(provider)).await;
        }
        let options = *self.inner.options.lock().await;
        let state = gw_core::ConnectionState::fresh(endpoint.clone(), &options);
        self.inner.registry.lock().await.insert(endpoint, RegistryEntry::new(proxy, state));
    }

    /// The single connect/reconnect attempt body shared by every caller
    /// that tries to bring an endpoint up: `connectEndpoint`, `addEndpoint`,
    /// `connect-all`, and reconnect execution (manual or timer-fired).
    ///
    /// `via_reconnect` distinguishes a reconnect attempt (which marks
    /// `isReconnecting`/`lastReconnectAttempt` and best-effort disconnects
    /// first, per §4.3.7 "Execution") from a plain manual connect.
    async fn attempt_connect(
        &self,
        endpoint: &EndpointUrl,
        operation: Operation,
        via_reconnect: bool,
    ) -> Result<(), GatewayError> {
        let proxy = {
            let registry = self.inner.registry.lock().await;
            registry
                .get(endpoint)
                .ok_or_else(|| GatewayError::EndpointNotFound(endpoint.to_string()))?
                .proxy
                .clone()
        };
        let options = *self.inner.options.lock().await;

        if via_reconnect {
            {
                let mut registry = self.inner.registry.lock().await;
                if let Some(entry) = registry.get_mut(endpoint) {
                    entry.state.begin_reconnect_attempt(Utc::now());
                }
            }
            proxy.disconnect().await;
        }

        let result = proxy.connect(options.connection_timeout()).await;

        let mut registry = self.inner.registry.lock().await;
        let Some(entry) = registry.get_mut(endpoint) else {
            // Endpoint was removed/cleaned up while this attempt was in flight;
            // the result is observed by nobody (spec §5 "in-flight connect calls
            // are allowed to run to completion, their results are ignored").
            return result.map_err(|reason| GatewayError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason,
            });
        };

        match result {
            Ok(()) => {
                entry.state.mark_connected(Utc::now());
                entry.cancel_reconnect();
                drop(registry);
                self.inner.event_bus.publish(EndpointStatusEvent::new(
                    endpoint.to_string(),
                    true,
                    operation,
                    true,
                    None,
                ));
                Ok(())
            }
            Err(reason) => {
                let old_attempts = entry.state.reconnect_attempts;
                let should_schedule = old_attempts < options.max_reconnect_attempts;
                entry.state.mark_connect_failed(&reason);
                entry.state.reconnect_attempts = old_attempts + 1;
                entry.state.is_reconnecting = should_schedule;
                if !should_schedule {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempts = entry.state.reconnect_attempts,
                        "reconnect ceiling reached, giving up until manual intervention"
                    );
                }
                drop(registry);

                self.inner.event_bus.publish(EndpointStatusEvent::new(
                    endpoint.to_string(),
                    false,
                    operation,
                    false,
                    Some(reason.clone()),
                ));

                if should_schedule {
                    self.schedule_reconnect(endpoint.clone()).await;
                }

                Err(GatewayError::ConnectFailed { endpoint: endpoint.to_string(), reason })
            }
        }
    }

    /// §4.3.7 "Scheduling": spawn a timer that fires the reconnect body
    /// after `options.reconnectInterval`. A no-op if a timer is already
    /// pending for this endpoint — at most one timer per endpoint, always.
    async fn schedule_reconnect(&self, endpoint: EndpointUrl) {
        let mut registry = self.inner.registry.lock().await;
        let Some(entry) = registry.get_mut(&endpoint) else { return };
        if entry.reconnect_task.is_some() {
            return;
        }
        let interval = { *self.inner.options.lock().await }.reconnect_interval();
        let manager = self.clone();
        let task = ScheduledTask::spawn(async move {
            tokio::time::sleep(interval).await;
            manager.fire_reconnect(endpoint).await;
        });
        entry.reconnect_task = Some(task);
    }

    async fn fire_reconnect(&self, endpoint: EndpointUrl) {
        {
            let mut registry = self.inner.registry.lock().await;
            match registry.get_mut(&endpoint) {
                Some(entry) => entry.reconnect_task = None,
                None => return,
            }
        }
        let _ = self.attempt_connect(&endpoint, Operation::Reconnect, true).await;
    }
}
