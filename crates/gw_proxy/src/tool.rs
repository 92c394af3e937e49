use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON tool definition, as discovered from an MCP server (spec §6).
///
/// `input_schema` is opaque to both the proxy and the manager — neither
/// interprets its contents, they only forward it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The local service supplying the tool catalogue exposed over each proxy
/// (spec §6, consumed interface).
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn list_tools(&self) -> Vec<Tool>;

    /// Execute a tool call by name. `None` means "no such tool" — the proxy
    /// turns that into a JSON-RPC error response; it does not otherwise
    /// interpret the result.
    async fn call_tool(&self, name: &str, arguments: &Value) -> Option<Result<Value, String>>;
}

/// A static, in-memory [`ToolProvider`] useful for tests and the demo
/// harness.
pub struct StaticToolProvider {
    tools: Vec<Tool>,
}

impl StaticToolProvider {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolProvider for StaticToolProvider {
    async fn list_tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    async fn call_tool(&self, name: &str, _arguments: &Value) -> Option<Result<Value, String>> {
        if self.tools.iter().any(|t| t.name == name) {
            Some(Ok(Value::Null))
        } else {
            None
        }
    }
}
