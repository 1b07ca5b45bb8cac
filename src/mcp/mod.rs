//! MCP 工具网关层：能力发现、描述符固化、带超时的统一调用入口

pub mod gateway;
pub mod provider;
pub mod types;

pub use gateway::ToolGateway;
pub use provider::{HttpToolProvider, RawTool, ToolProvider};
pub use types::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, ToolParam};
