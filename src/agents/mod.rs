//! 智能体层：指令文法、专项智能体、规划合成、输出解析与兜底构建

pub mod directive;
pub mod fallback;
pub mod parser;
pub mod planner;
pub mod specialized;

pub use directive::{extract_directive, parse_directive, DIRECTIVE_MARKER};
pub use planner::PlannerAgent;
pub use specialized::{
    hotel_agent, poi_agent, weather_agent, AgentTurnOutput, SpecializedAgent,
};
