use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::proxy::ProxyConnection;
use crate::tool::ToolProvider;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the outgoing-frame channel each live session owns.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

struct Session {
    write_tx: mpsc::Sender<Message>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl Session {
    async fn shut_down(self) {
        self.read_task.abort();
        self.write_task.abort();
        let _ = self.read_task.await;
        let _ = self.write_task.await;
    }
}

/// [`ProxyConnection`] backed by [`tokio_tungstenite`].
///
/// `connect` performs the WS handshake plus a minimal MCP `initialize`
/// round trip (the only JSON-RPC frame this crate interprets — parsing the
/// rest of the MCP frame protocol is the out-of-scope concern spec.md §1
/// assigns to the proxy's internals, not to this reference shape). Tool
/// call/list requests arriving after the handshake are answered from
/// whatever [`ToolProvider`] is currently installed.
pub struct WebSocketProxy {
    url: Url,
    connected: Arc<AtomicBool>,
    provider: Arc<RwLock<Option<Arc<dyn ToolProvider>>>>,
    session: Mutex<Option<Session>>,
}

impl WebSocketProxy {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connected: Arc::new(AtomicBool::new(false)),
            provider: Arc::new(RwLock::new(None)),
            session: Mutex::new(None),
        }
    }

    async fn handshake(stream: &mut WsStream, timeout: Duration) -> Result<(), String> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "init",
            "method": "initialize",
            "params": {},
        });
        stream
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| format!("failed to send initialize request: {e}"))?;

        let reply = tokio::time::timeout(timeout, stream.next())
            .await
            .map_err(|_| "timed out waiting for initialize response".to_string())?
            .ok_or_else(|| "connection closed before initialize response".to_string())?
            .map_err(|e| format!("transport error awaiting initialize response: {e}"))?;

        match reply {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| format!("malformed initialize response: {e}"))?;
                if value.get("error").is_some() {
                    return Err(format!("server rejected initialize: {value}"));
                }
                Ok(())
            }
            Message::Close(frame) => {
                Err(format!("connection closed during handshake: {frame:?}"))
            }
            _ => Err("unexpected frame during handshake".to_string()),
        }
    }

    fn spawn_session(
        &self,
        stream: WsStream,
    ) -> Session {
        let (mut sink, mut source) = stream.split();
        let (write_tx, mut write_rx) = mpsc::channel::<Message>(OUTBOUND_CHANNEL_CAPACITY);

        let write_task = tokio::spawn(async move {
            while let Some(msg) = write_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let provider = self.provider.clone();
        let connected = self.connected.clone();
        let reply_tx = write_tx.clone();
        let read_task = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let frame = match frame {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::debug!("proxy read error, closing: {e}");
                        break;
                    }
                };
                match frame {
                    Message::Text(text) => {
                        handle_upstream_frame(&text, &provider, &reply_tx).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            connected.store(false, Ordering::Relaxed);
        });

        Session { write_tx, read_task, write_task }
    }
}

async fn handle_upstream_frame(
    text: &str,
    provider: &RwLock<Option<Arc<dyn ToolProvider>>>,
    reply_tx: &mpsc::Sender<Message>,
) {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        tracing::debug!("ignoring non-JSON upstream frame");
        return;
    };
    let Some(method) = value.get("method").and_then(Value::as_str) else {
        // Responses to our own outgoing calls (e.g. future server->client
        // requests) are not yet part of this proxy's surface; ignore.
        return;
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let guard = provider.read().await;

    let response = match (method, guard.as_ref()) {
        ("tools/list", Some(p)) => {
            let tools = p.list_tools().await;
            json!({"jsonrpc": "2.0", "id": id, "result": {"tools": tools}})
        }
        ("tools/list", None) => {
            json!({"jsonrpc": "2.0", "id": id, "result": {"tools": []}})
        }
        ("tools/call", Some(p)) => {
            let name = value
                .pointer("/params/name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let empty = json!({});
            let arguments = value.pointer("/params/arguments").unwrap_or(&empty);
            match p.call_tool(name, arguments).await {
                Some(Ok(result)) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Some(Err(reason)) => {
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": reason}})
                }
                None => {
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": format!("unknown tool {name:?}")}})
                }
            }
        }
        ("tools/call", None) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32603, "message": "no tool provider installed"}})
        }
        _ => return,
    };
    drop(guard);

    let _ = reply_tx.send(Message::Text(response.to_string())).await;
}

#[async_trait]
impl ProxyConnection for WebSocketProxy {
    async fn connect(&self, timeout: Duration) -> Result<(), String> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut stream = tokio::time::timeout(timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| format!("connect timed out after {timeout:?}"))?
            .map_err(|e| format!("websocket handshake failed: {e}"))?
            .0;

        Self::handshake(&mut stream, timeout).await?;

        let session = self.spawn_session(stream);
        *guard = Some(session);
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        self.connected.store(false, Ordering::Relaxed);
        if let Some(session) = session {
            session.shut_down().await;
        }
    }

    async fn set_tool_provider(&self, provider: Option<Arc<dyn ToolProvider>>) {
        *self.provider.write().await = provider;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
