//! 工具网关数据类型
//!
//! ToolDescriptor 在能力发现后不可变，归 ToolGateway 独占；
//! ToolInvocationRequest / ToolInvocationResult 为单次调用的一次性载体。

use serde_json::{Map, Value};

/// 工具参数描述（从提供方 inputSchema 提炼：参数名 + 是否必填）
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    pub name: String,
    pub required: bool,
}

/// 已发现工具的描述符：名称、说明、参数表
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolDescriptor {
    /// 从 MCP inputSchema（JSON Schema object）提炼参数表；
    /// schema 缺失或非 object 时视为无参数约束
    pub fn from_input_schema(name: String, description: String, schema: Option<&Value>) -> Self {
        let mut params = Vec::new();
        if let Some(schema) = schema {
            let required: Vec<&str> = schema
                .get("required")
                .and_then(|r| r.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
                for key in props.keys() {
                    params.push(ToolParam {
                        name: key.clone(),
                        required: required.contains(&key.as_str()),
                    });
                }
            }
        }
        Self {
            name,
            description,
            params,
        }
    }

    /// 检查必填参数是否齐全，返回第一个缺失的参数名
    pub fn missing_required<'a>(&'a self, arguments: &Map<String, Value>) -> Option<&'a str> {
        self.params
            .iter()
            .find(|p| p.required && !arguments.contains_key(&p.name))
            .map(|p| p.name.as_str())
    }
}

/// 一次工具调用请求（由指令解析或直接调用方构造，消费一次即弃）
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRequest {
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// 工具调用结果：网关把超时与提供方错误统一折叠为 ok=false + 错误详情，
/// 调用方永远不需要区分传输异常与工具自身报错
#[derive(Debug, Clone)]
pub struct ToolInvocationResult {
    pub ok: bool,
    pub payload: Value,
    pub error: Option<String>,
}

impl ToolInvocationResult {
    pub fn success(payload: Value) -> Self {
        Self {
            ok: true,
            payload,
            error: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: Value::Null,
            error: Some(detail.into()),
        }
    }
}
