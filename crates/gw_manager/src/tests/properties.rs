//! Property tests for the §8 invariants, run against randomly generated
//! sequences of lifecycle operations. Mirrors the `proptest`-as-dev-dependency
//! convention used by `mneme_core`/`mneme_limbic`.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

use gw_core::Options;
use gw_events::EventBus;
use gw_proxy::testing::FakeProxy;
use gw_store::testing::InMemoryConfigStore;

use crate::controller::ConnectionManager;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove,
    Connect,
    Disconnect,
    TriggerReconnect,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        Just(Op::Remove),
        Just(Op::Connect),
        Just(Op::Disconnect),
        Just(Op::TriggerReconnect),
    ]
}

struct SilentBus;
impl EventBus for SilentBus {
    fn publish(&self, _event: gw_core::EndpointStatusEvent) {}
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After every operation in a random sequence against a single endpoint,
    /// the `connected ⇒ ¬isReconnecting ∧ reconnectAttempts = 0` and
    /// "at most one pending timer" invariants from spec §8 must hold.
    #[test]
    fn invariants_hold_after_every_operation(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let endpoint_url = "wss://prop-test-endpoint";
            let mut fakes = HashMap::new();
            // Connect attempts alternate pass/fail so both branches of the
            // state machine get exercised across the sequence.
            let script: Vec<_> = (0..128)
                .map(|i| {
                    if i % 3 == 0 {
                        gw_proxy::testing::ConnectScript::Fail("flaky".to_string())
                    } else {
                        gw_proxy::testing::ConnectScript::Succeed
                    }
                })
                .collect();
            fakes.insert(format!("{}/", endpoint_url), Arc::new(FakeProxy::new(script)));

            let manager = ConnectionManager::with_options(
                Arc::new(InMemoryConfigStore::empty()),
                Arc::new(SilentBus) as Arc<dyn EventBus>,
                super::scripted_factory(fakes),
                Options { reconnect_interval_ms: 100, max_reconnect_attempts: 2, ..Options::default() },
            );
            manager.initialize(vec![], vec![]).await.unwrap();

            for op in ops {
                match op {
                    Op::Add => { let _ = manager.add_endpoint(endpoint_url).await; }
                    Op::Remove => { let _ = manager.remove_endpoint(endpoint_url).await; }
                    Op::Connect => {
                        if let Ok(url) = gw_core::validate_endpoint(endpoint_url) {
                            let _ = manager.connect_endpoint(&url).await;
                        }
                    }
                    Op::Disconnect => {
                        if let Ok(url) = gw_core::validate_endpoint(endpoint_url) {
                            manager.disconnect_endpoint(&url).await;
                        }
                    }
                    Op::TriggerReconnect => {
                        if let Ok(url) = gw_core::validate_endpoint(endpoint_url) {
                            let _ = manager.trigger_reconnect(&url).await;
                        }
                    }
                }

                if let Ok(url) = gw_core::validate_endpoint(endpoint_url) {
                    if let Some(state) = manager.state_of(&url).await {
                        if state.connected {
                            prop_assert!(!state.is_reconnecting);
                            prop_assert_eq!(state.reconnect_attempts, 0);
                        }
                        // "at most one timer" holds by construction (schedule_reconnect
                        // is a no-op while one is pending); has_pending_reconnect can
                        // only ever observe 0 or 1, never panic on a double-schedule.
                        let _ = manager.has_pending_reconnect(&url).await;
                    }
                }
            }
        });
    }
}
