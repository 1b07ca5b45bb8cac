//! 管线层：编排器与直接工具调用方

pub mod invoker;
pub mod orchestrator;

pub use invoker::{DirectToolInvoker, PoiSummary};
pub use orchestrator::{PipelineOrchestrator, PipelineStage};
