//! End-to-end scenarios and invariants from spec §8, exercised against
//! `gw_proxy::testing::FakeProxy` and `gw_store::testing::InMemoryConfigStore`
//! so no real socket or filesystem is touched.

mod properties;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use gw_core::{EndpointStatusEvent, GatewayError, Options};
use gw_events::EventBus;
use gw_proxy::testing::{ConnectScript, FakeProxy};
use gw_proxy::ProxyConnection;
use gw_store::testing::InMemoryConfigStore;

use crate::controller::ConnectionManager;

/// Records every published event for later assertion, instead of routing
/// through a real broadcast channel — tests want a synchronous snapshot,
/// not a subscriber race.
#[derive(Default)]
struct RecordingEventBus {
    events: StdMutex<Vec<EndpointStatusEvent>>,
}

impl RecordingEventBus {
    fn snapshot(&self) -> Vec<EndpointStatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventBus for RecordingEventBus {
    fn publish(&self, event: EndpointStatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A [`ConnectionManager`] proxy factory that hands out pre-registered
/// fakes by endpoint, falling back to an always-succeeding fake for any
/// endpoint not explicitly wired — so `initialize`/`addEndpoint` calls in
/// tests that don't care about a particular endpoint's script still work.
fn scripted_factory(
    fakes: HashMap<String, Arc<FakeProxy>>,
) -> crate::controller::ProxyFactory {
    let fakes = Arc::new(fakes);
    Box::new(move |endpoint| {
        let key = endpoint.to_string();
        match fakes.get(&key) {
            Some(fake) => fake.clone() as Arc<dyn ProxyConnection>,
            None => Arc::new(FakeProxy::always_succeeds()) as Arc<dyn ProxyConnection>,
        }
    })
}

/// Polls `condition` every 5ms until it's true or `budget` elapses, for
/// assertions that depend on a background reconnect timer firing. Real
/// wall-clock waits (rather than `tokio::time::pause`/`advance`) because a
/// reconnect timer runs on a task spawned off the calling test's stack —
/// keeping the clock real sidesteps having to hand-drive the executor
/// through each intermediate poll.
async fn wait_until(budget: std::time::Duration, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + budget;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {budget:?}");
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

fn manager_with(
    store: InMemoryConfigStore,
    fakes: HashMap<String, Arc<FakeProxy>>,
    options: Options,
) -> (ConnectionManager, Arc<RecordingEventBus>) {
    let bus = Arc::new(RecordingEventBus::default());
    let manager = ConnectionManager::with_options(
        Arc::new(store),
        bus.clone() as Arc<dyn EventBus>,
        scripted_factory(fakes),
        options,
    );
    (manager, bus)
}

#[tokio::test]
async fn scenario_1_happy_path_add() {
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();

    manager.add_endpoint("wss://a").await.unwrap();

    let events = bus.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].endpoint, "wss://a/");
    assert!(events[0].success);

    let endpoints = manager.get_endpoints().await;
    assert_eq!(endpoints.len(), 1);
    let state = manager.state_of(&endpoints[0]).await.unwrap();
    assert!(state.connected);
    assert_eq!(state.reconnect_attempts, 0);
}

#[tokio::test]
async fn scenario_2_duplicate_in_store() {
    let store = InMemoryConfigStore::new(["wss://a"]);
    let (manager, bus) = manager_with(store, HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();

    let err = manager.add_endpoint("wss://a").await.unwrap_err();
    assert_eq!(err, GatewayError::EndpointAlreadyInConfig("wss://a".to_string()));
    assert!(bus.snapshot().is_empty());
    assert!(manager.get_endpoints().await.is_empty());
}

#[tokio::test]
async fn scenario_3_connect_failure_then_bounded_reconnect() {
    let options = Options { reconnect_interval_ms: 30, max_reconnect_attempts: 2, ..Options::default() };
    let fake = Arc::new(FakeProxy::always_fails("boom"));
    let mut fakes = HashMap::new();
    fakes.insert("wss://a/".to_string(), fake.clone());
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), fakes, options);

    manager.initialize(vec!["wss://a".to_string()], vec![]).await.unwrap();
    let endpoint = manager.get_endpoints().await.into_iter().next().unwrap();

    let err = manager.connect_endpoint(&endpoint).await.unwrap_err();
    assert!(matches!(err, GatewayError::ConnectFailed { .. }));

    // Two scheduled reconnects still need to fire before the ceiling stops them.
    wait_until(std::time::Duration::from_secs(2), || bus.snapshot().len() >= 3).await;

    let events = bus.snapshot();
    assert_eq!(events.len(), 3, "manual attempt + two scheduled reconnects");
    assert!(events.iter().all(|e| !e.success));
    assert!(events[1].timestamp - events[0].timestamp >= 20);
    assert!(events[2].timestamp - events[1].timestamp >= 20);

    let state = manager.state_of(&endpoint).await.unwrap();
    assert_eq!(state.reconnect_attempts, 3);
    assert!(!state.is_reconnecting, "ceiling reached, no further timer scheduled");
    assert_eq!(state.last_error, "boom");
}

#[tokio::test]
async fn scenario_4_connect_failure_then_recovery() {
    let options = Options { reconnect_interval_ms: 30, max_reconnect_attempts: 2, ..Options::default() };
    let fake = Arc::new(FakeProxy::new(vec![
        ConnectScript::Fail("boom".to_string()),
        ConnectScript::Succeed,
    ]));
    let mut fakes = HashMap::new();
    fakes.insert("wss://a/".to_string(), fake.clone());
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), fakes, options);

    manager.initialize(vec!["wss://a".to_string()], vec![]).await.unwrap();
    let endpoint = manager.get_endpoints().await.into_iter().next().unwrap();

    assert!(manager.connect_endpoint(&endpoint).await.is_err());

    wait_until(std::time::Duration::from_secs(2), || bus.snapshot().len() >= 2).await;

    let events = bus.snapshot();
    assert_eq!(events.len(), 2);
    assert!(!events[0].success);
    assert!(events[1].success);

    let state = manager.state_of(&endpoint).await.unwrap();
    assert_eq!(state.reconnect_attempts, 0);
    assert!(state.connected);
}

#[tokio::test]
async fn scenario_5_rollback_on_add() {
    let fake = Arc::new(FakeProxy::always_fails("boom"));
    let mut fakes = HashMap::new();
    fakes.insert("wss://a/".to_string(), fake.clone());
    let store = Arc::new(InMemoryConfigStore::empty());
    let bus = Arc::new(RecordingEventBus::default());
    let manager = ConnectionManager::with_options(
        store.clone(),
        bus.clone() as Arc<dyn EventBus>,
        scripted_factory(fakes),
        Options { max_reconnect_attempts: 0, ..Options::default() },
    );
    manager.initialize(vec![], vec![]).await.unwrap();

    let err = manager.add_endpoint("wss://a").await.unwrap_err();
    assert!(matches!(err, GatewayError::ConnectFailed { .. }));

    assert_eq!(store.remove_calls(), vec!["wss://a".to_string()]);
    assert!(manager.get_endpoints().await.is_empty());
    let events = bus.snapshot();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(events[0].operation, gw_core::Operation::Connect);
}

#[tokio::test]
async fn scenario_6_concurrent_connect_all_partial_success() {
    let mut fakes = HashMap::new();
    fakes.insert("wss://a/".to_string(), Arc::new(FakeProxy::always_succeeds()));
    fakes.insert("wss://b/".to_string(), Arc::new(FakeProxy::always_succeeds()));
    fakes.insert("wss://c/".to_string(), Arc::new(FakeProxy::always_fails("boom")));
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), fakes, Options::default());

    manager
        .initialize(
            vec!["wss://a".to_string(), "wss://b".to_string(), "wss://c".to_string()],
            vec![],
        )
        .await
        .unwrap();

    manager.connect_all().await.unwrap();

    let events = bus.snapshot();
    assert_eq!(events.len(), 3);
    assert_eq!(events.iter().filter(|e| e.success).count(), 2);
    assert_eq!(events.iter().filter(|e| !e.success).count(), 1);

    let c = manager
        .get_endpoints()
        .await
        .into_iter()
        .find(|e| e.as_str() == "wss://c/")
        .unwrap();
    let state = manager.state_of(&c).await.unwrap();
    assert_eq!(state.reconnect_attempts, 1);
    assert!(state.is_reconnecting);
}

#[tokio::test]
async fn boundary_initialize_empty_succeeds() {
    let (manager, _bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();
    assert!(manager.get_endpoints().await.is_empty());
}

#[tokio::test]
async fn boundary_initialize_collapses_duplicate_endpoint() {
    let (manager, _bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager
        .initialize(vec!["ws://x".to_string(), "ws://x".to_string()], vec![])
        .await
        .unwrap();
    assert_eq!(manager.get_endpoints().await.len(), 1);
}

#[tokio::test]
async fn boundary_update_options_rejects_and_leaves_state_unchanged() {
    let (manager, _bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    let before = manager.options().await;
    let err = manager
        .update_options(&serde_json::json!({"reconnectInterval": 99}))
        .await
        .unwrap_err();
    assert!(!err.is_empty());
    assert_eq!(manager.options().await, before);
}

#[tokio::test]
async fn boundary_connect_unknown_endpoint_fails_with_not_found() {
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();
    let unknown = gw_core::validate_endpoint("wss://ghost").unwrap();
    let err = manager.connect_endpoint(&unknown).await.unwrap_err();
    assert_eq!(err, GatewayError::EndpointNotFound("wss://ghost/".to_string()));
    assert!(bus.snapshot().is_empty());
}

#[tokio::test]
async fn boundary_remove_unknown_endpoint_is_a_no_op() {
    let (manager, bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();
    manager.remove_endpoint("wss://ghost").await.unwrap();
    assert!(bus.snapshot().is_empty());
}

#[tokio::test]
async fn law_add_then_remove_is_a_no_op() {
    let (manager, _bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec![], vec![]).await.unwrap();
    manager.add_endpoint("wss://a").await.unwrap();
    manager.remove_endpoint("wss://a").await.unwrap();
    assert!(manager.get_endpoints().await.is_empty());
}

#[tokio::test]
async fn law_stop_then_trigger_reconnect_yields_exactly_one_attempt() {
    let fake = Arc::new(FakeProxy::always_fails("boom"));
    let mut fakes = HashMap::new();
    fakes.insert("wss://a/".to_string(), fake.clone());
    let (manager, _bus) =
        manager_with(InMemoryConfigStore::empty(), fakes, Options { max_reconnect_attempts: 0, ..Options::default() });
    manager.initialize(vec!["wss://a".to_string()], vec![]).await.unwrap();
    let endpoint = manager.get_endpoints().await.into_iter().next().unwrap();

    manager.stop_reconnect(&endpoint).await;
    let before = fake.connect_call_count();
    assert!(manager.trigger_reconnect(&endpoint).await.is_err());
    assert_eq!(fake.connect_call_count(), before + 1);
}

#[tokio::test]
async fn cleanup_then_initialize_matches_fresh_manager() {
    let (manager, _bus) = manager_with(InMemoryConfigStore::empty(), HashMap::new(), Options::default());
    manager.initialize(vec!["wss://a".to_string()], vec![]).await.unwrap();
    manager.cleanup().await;
    manager.initialize(vec!["wss://b".to_string()], vec![]).await.unwrap();

    let endpoints = manager.get_endpoints().await;
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].as_str(), "wss://b/");
}
