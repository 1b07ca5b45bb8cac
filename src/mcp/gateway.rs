//! 工具网关
//!
//! 持有一个 ToolProvider 连接：构建时做一次能力发现并固化 ToolDescriptor 集合，
//! invoke 时校验工具名与必填参数、施加单次超时，并把一切失败折叠为
//! ok=false 的 ToolInvocationResult；每次调用输出结构化审计日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::error::PlanError;
use crate::mcp::provider::ToolProvider;
use crate::mcp::types::{ToolDescriptor, ToolInvocationResult};

/// 工具网关：发现后只读，可被多个智能体与直调方并发共享（Arc<ToolGateway>）
pub struct ToolGateway {
    provider: Arc<dyn ToolProvider>,
    tools: HashMap<String, ToolDescriptor>,
    call_timeout: Duration,
}

impl ToolGateway {
    /// 连接提供方并做一次能力发现；提供方不可达或发现失败即 ProviderUnavailable（致命，不重试）
    pub async fn connect(
        provider: Arc<dyn ToolProvider>,
        call_timeout_secs: u64,
    ) -> Result<Self, PlanError> {
        let call_timeout = Duration::from_secs(call_timeout_secs);
        let raw = timeout(call_timeout, provider.list_tools())
            .await
            .map_err(|_| PlanError::ProviderUnavailable("tool discovery timed out".to_string()))?
            .map_err(PlanError::ProviderUnavailable)?;

        if raw.is_empty() {
            return Err(PlanError::ProviderUnavailable(
                "provider exposed no tools".to_string(),
            ));
        }

        let tools: HashMap<String, ToolDescriptor> = raw
            .into_iter()
            .map(|t| {
                let desc = ToolDescriptor::from_input_schema(
                    t.name.clone(),
                    t.description.unwrap_or_default(),
                    t.input_schema.as_ref(),
                );
                (t.name, desc)
            })
            .collect();

        tracing::info!(tool_count = tools.len(), "tool gateway ready");
        Ok(Self {
            provider,
            tools,
            call_timeout,
        })
    }

    /// 已发现工具名列表
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// 调用工具：未发现的工具名与缺失必填参数快速拒绝（仍以 ok=false 结果表达），
    /// 超时与提供方错误同样折叠进结果，不向外抛传输异常
    pub async fn invoke(&self, tool_name: &str, arguments: Map<String, Value>) -> ToolInvocationResult {
        let start = Instant::now();

        let result = match self.tools.get(tool_name) {
            None => ToolInvocationResult::failure(format!("unknown tool: {tool_name}")),
            Some(desc) => match desc.missing_required(&arguments) {
                Some(param) => ToolInvocationResult::failure(format!(
                    "missing required argument `{param}` for tool {tool_name}"
                )),
                None => {
                    let call = self
                        .provider
                        .call_tool(tool_name, Value::Object(arguments.clone()));
                    match timeout(self.call_timeout, call).await {
                        Ok(Ok(payload)) => ToolInvocationResult::success(payload),
                        Ok(Err(e)) => ToolInvocationResult::failure(e),
                        Err(_) => ToolInvocationResult::failure(format!(
                            "tool {tool_name} timed out after {}s",
                            self.call_timeout.as_secs()
                        )),
                    }
                }
            },
        };

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.ok,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&arguments),
            "error": result.error,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }
}

fn args_preview(args: &Map<String, Value>) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
