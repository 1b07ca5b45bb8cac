//! 规划管线错误类型
//!
//! 除 ProviderUnavailable（网关构建期）与 FallbackBuildFailed（兜底构建失败）外，
//! 其余错误均在管线内部吸收并降级为占位内容，不向调用方抛出。

use thiserror::Error;

/// 规划管线运行过程中可能出现的错误（网关、LLM、指令解析、结构化输出解析等）
#[derive(Error, Debug)]
pub enum PlanError {
    /// 工具提供方不可达或能力发现失败，网关构建期致命错误，不静默重试
    #[error("Tool provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// 工具调用失败（已被网关吸收进 ToolInvocationResult，仅在需要显式传播时使用）
    #[error("Tool invocation failed: {0}")]
    ToolInvocationFailed(String),

    /// 模型输出中的工具指令格式错误（智能体降级继续，不中断管线）
    #[error("Malformed tool directive: {0}")]
    DirectiveMalformed(String),

    /// 规划输出无法解析为合法 TripPlan（触发兜底计划构建）
    #[error("Failed to parse trip plan: {0}")]
    ParseFailed(String),

    /// 兜底计划构建失败——管线唯一的运行期致命错误
    #[error("Fallback plan build failed: {0}")]
    FallbackBuildFailed(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
