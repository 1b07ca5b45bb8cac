//! Swallow - Rust 多智能体旅行行程规划系统
//!
//! 模块划分：
//! - **agents**: 专项智能体（POI/天气/酒店）、规划合成、指令文法、输出解析与兜底
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 管线错误分类（致命仅两种：网关构建失败与兜底构建失败）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Scripted Mock）
//! - **mcp**: 工具网关（能力发现、参数校验、带超时的统一调用）
//! - **pipeline**: 管线编排器与直接工具调用方
//! - **schema**: TripRequest / TripPlan 数据模型与校验

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod observability;
pub mod pipeline;
pub mod schema;

pub use error::PlanError;
pub use pipeline::PipelineOrchestrator;
pub use schema::{TripPlan, TripRequest};
