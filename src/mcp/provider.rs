//! 工具提供方抽象与 HTTP JSON-RPC 实现
//!
//! ToolProvider 只要求 list_tools / call_tool 两个语义，任何满足
//! 能力发现 + 调用语义的远端（高德 MCP、自建服务、测试 Mock）都可替换接入。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// 提供方返回的原始工具条目（未提炼为 ToolDescriptor）
#[derive(Debug, Clone, Deserialize)]
pub struct RawTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

/// 工具提供方 trait：能力发现 + 按名调用，传输细节对上层不可见
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// 列出可调用工具
    async fn list_tools(&self) -> Result<Vec<RawTool>, String>;

    /// 调用指定工具，返回提供方原始负载
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, String>;
}

/// JSON-RPC over HTTP 的 MCP 提供方（高德 amap-mcp-server 的 HTTP 形态）
pub struct HttpToolProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl HttpToolProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            next_id: AtomicU64::new(1),
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("{method} request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("{method} HTTP error: {}", response.status()));
        }

        let parsed: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| format!("{method} response parse failed: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("{method} provider error {}: {}", err.code, err.message));
        }
        parsed
            .result
            .ok_or_else(|| format!("{method} response missing result"))
    }
}

#[async_trait]
impl ToolProvider for HttpToolProvider {
    async fn list_tools(&self) -> Result<Vec<RawTool>, String> {
        let result = self.rpc("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| "tools/list result missing tools".to_string())?;
        serde_json::from_value(tools).map_err(|e| format!("tools/list parse failed: {e}"))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, String> {
        let result = self
            .rpc(
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        // MCP 把负载包在 content 数组里；取首个 text/json 项，取不到则原样返回
        if let Some(first) = result
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
        {
            if let Some(text) = first.get("text").and_then(|t| t.as_str()) {
                if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                    return Ok(parsed);
                }
                return Ok(Value::String(text.to_string()));
            }
            return Ok(first.clone());
        }
        Ok(result)
    }
}
