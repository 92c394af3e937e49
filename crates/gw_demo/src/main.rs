use std::sync::Arc;

use clap::Parser;
use gw_core::{EndpointStatusEvent, Options};
use gw_events::{BroadcastEventBus, EventBus};
use gw_proxy::testing::FakeProxy;
use gw_proxy::{ProxyConnection, Tool};
use gw_store::testing::InMemoryConfigStore;
use gw_manager::ConnectionManager;
use tracing::info;

/// Drives a [`ConnectionManager`] against fake upstreams so the lifecycle
/// can be watched end to end without a real MCP server on the other side.
/// Not part of the manager's API — an integrator harness only.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated endpoint URLs to connect on startup.
    #[arg(long, default_value = "wss://demo-a.local,wss://demo-b.local,wss://demo-c.local")]
    endpoints: String,

    /// Endpoint substring whose fake proxy always fails, to demonstrate
    /// bounded reconnection.
    #[arg(long, default_value = "demo-c")]
    fail_contains: String,

    #[arg(long, default_value_t = 500)]
    reconnect_interval_ms: u64,

    #[arg(long, default_value_t = 3)]
    max_reconnect_attempts: u32,

    #[arg(long, default_value_t = 5_000)]
    connection_timeout_ms: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let options = Options {
        reconnect_interval_ms: args.reconnect_interval_ms,
        max_reconnect_attempts: args.max_reconnect_attempts,
        connection_timeout_ms: args.connection_timeout_ms,
    };
    options.validate().map_err(|violations| anyhow::anyhow!(violations.join("; ")))?;

    let fail_contains = args.fail_contains.clone();
    let proxy_factory: gw_manager::ProxyFactory = Box::new(move |endpoint| {
        if endpoint.as_str().contains(&fail_contains) {
            Arc::new(FakeProxy::always_fails("demo upstream refused the handshake")) as Arc<dyn ProxyConnection>
        } else {
            Arc::new(FakeProxy::always_succeeds()) as Arc<dyn ProxyConnection>
        }
    });

    let event_bus = Arc::new(BroadcastEventBus::default());
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_status_event(&event);
        }
    });

    let manager = ConnectionManager::with_options(
        Arc::new(InMemoryConfigStore::empty()),
        event_bus as Arc<dyn EventBus>,
        proxy_factory,
        options,
    );

    manager.on_config_change(|event| {
        info!(kind = ?event.kind, "configChange");
    });

    let demo_tools = vec![Tool {
        name: "ping".to_string(),
        description: "Replies pong; used to exercise the tool-sync path".to_string(),
        input_schema: serde_json::json!({"type": "object", "properties": {}}),
    }];

    let endpoints: Vec<String> = args
        .endpoints
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    info!(?endpoints, "initializing connection manager");
    manager.initialize(endpoints, demo_tools).await?;

    match manager.connect_all().await {
        Ok(()) => info!("connect-all: at least one endpoint came up"),
        Err(e) => tracing::warn!(error = %e, "connect-all: every endpoint failed"),
    }

    info!("watching reconnect activity on the failing endpoint for 5s, then Ctrl+C to exit cleanly");
    tokio::select! {
        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted early");
        }
    }

    for endpoint in manager.get_endpoints().await {
        if let Some(state) = manager.state_of(&endpoint).await {
            info!(
                endpoint = endpoint.as_str(),
                connected = state.connected,
                reconnect_attempts = state.reconnect_attempts,
                is_reconnecting = state.is_reconnecting,
                last_error = %state.last_error,
                "final state"
            );
        }
    }

    manager.cleanup().await;
    Ok(())
}

fn log_status_event(event: &EndpointStatusEvent) {
    if event.success {
        info!(
            endpoint = %event.endpoint,
            operation = ?event.operation,
            connected = event.connected,
            "endpoint:status:changed"
        );
    } else {
        tracing::warn!(
            endpoint = %event.endpoint,
            operation = ?event.operation,
            message = ?event.message,
            "endpoint:status:changed"
        );
    }
}
