//! The per-endpoint upstream WebSocket proxy connection (spec §4.1, §6).
//!
//! Owns exactly one socket. The manager never parses MCP frames itself —
//! it only observes a proxy through the return/throw of `connect` and the
//! `is_connected` snapshot.

pub mod proxy;
pub mod tool;
pub mod websocket;

#[cfg(feature = "test-util")]
pub mod testing;

pub use proxy::ProxyConnection;
pub use tool::{StaticToolProvider, Tool, ToolProvider};
pub use websocket::WebSocketProxy;
