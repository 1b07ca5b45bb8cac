//! 专项智能体
//!
//! 每个实例绑定共享 ToolGateway，提示词约束模型在回复中给出恰好一条
//! 工具调用指令（见 directive 模块文法）。单轮至多一次工具调用，不循环重试；
//! LLM 失败、指令缺失或格式错误都降级为"无工具结果的输出"，绝不中断管线。

use std::sync::Arc;

use crate::agents::directive::{extract_directive, parse_directive, DIRECTIVE_MARKER};
use crate::llm::{LlmClient, Message};
use crate::mcp::{ToolGateway, ToolInvocationResult};
use crate::schema::TripRequest;

/// 一次智能体回合的产出：原始文本 + 可选的已解析工具结果（供下一阶段做上下文）
#[derive(Debug, Clone)]
pub struct AgentTurnOutput {
    /// 智能体角色名（poi / weather / hotel / planner）
    pub role: String,
    pub raw_text: String,
    pub tool_result: Option<ToolInvocationResult>,
}

impl AgentTurnOutput {
    /// 某阶段超时或失败时的空产出：管线据此继续而非中止
    pub fn empty(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            raw_text: String::new(),
            tool_result: None,
        }
    }
}

/// 专项智能体：角色 + 工具白名单 + 提示词模板，共享一个 ToolGateway
pub struct SpecializedAgent {
    role: String,
    allowed_tools: Vec<String>,
    template: String,
    llm: Arc<dyn LlmClient>,
    gateway: Arc<ToolGateway>,
}

impl SpecializedAgent {
    pub fn new(
        role: impl Into<String>,
        allowed_tools: Vec<String>,
        template: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        gateway: Arc<ToolGateway>,
    ) -> Self {
        Self {
            role: role.into(),
            allowed_tools,
            template: template.into(),
            llm,
            gateway,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// 跑一个回合：渲染提示词 -> LLM -> 扫描指令 -> （如有）调用工具。
    /// 任何失败都落在 AgentTurnOutput 里，调用方看不到错误向外传播。
    pub async fn run(&self, request: &TripRequest) -> AgentTurnOutput {
        let prompt = self.render_prompt(request);
        let messages = [
            Message::system(self.system_prompt()),
            Message::user(prompt),
        ];

        let raw_text = match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(role = %self.role, error = %e, "agent LLM call failed, degrading");
                return AgentTurnOutput::empty(&self.role);
            }
        };

        let tool_result = match extract_directive(&raw_text) {
            None => {
                tracing::debug!(role = %self.role, "no tool directive in agent output");
                None
            }
            Some(line) => match parse_directive(line) {
                Err(e) => {
                    tracing::warn!(role = %self.role, error = %e, "malformed directive, degrading");
                    None
                }
                Ok(req) if !self.allowed_tools.iter().any(|t| t == &req.tool) => {
                    tracing::warn!(
                        role = %self.role,
                        tool = %req.tool,
                        "directive requested tool outside whitelist, degrading"
                    );
                    None
                }
                Ok(req) => Some(self.gateway.invoke(&req.tool, req.arguments).await),
            },
        };

        AgentTurnOutput {
            role: self.role.clone(),
            raw_text,
            tool_result,
        }
    }

    /// system 提示：角色、可用工具及参数、指令文法说明
    fn system_prompt(&self) -> String {
        let mut tool_lines = String::new();
        for name in &self.allowed_tools {
            if let Some(desc) = self.gateway.descriptor(name) {
                let params: Vec<String> = desc
                    .params
                    .iter()
                    .map(|p| {
                        if p.required {
                            format!("{}(必填)", p.name)
                        } else {
                            p.name.clone()
                        }
                    })
                    .collect();
                tool_lines.push_str(&format!(
                    "- {}: {} 参数: {}\n",
                    name,
                    desc.description,
                    params.join(", ")
                ));
            }
        }
        format!(
            "你是旅行规划系统中的{role}。你只能调用以下工具：\n{tools}\
             需要调用工具时，单独输出一行（不要包在代码块里）：\n\
             {marker}:工具名:参数名=参数值,参数名=参数值\n\
             每次回复至多一条指令，参数值不要加引号。",
            role = self.role,
            tools = tool_lines,
            marker = DIRECTIVE_MARKER,
        )
    }

    /// 渲染用户侧提示词：替换模板中的 {city} {start_date} {end_date} {days} {keywords}
    fn render_prompt(&self, request: &TripRequest) -> String {
        self.template
            .replace("{city}", &request.city)
            .replace("{start_date}", &request.start_date)
            .replace("{end_date}", &request.end_date)
            .replace("{days}", &request.travel_days.to_string())
            .replace("{keywords}", request.poi_keywords())
    }
}

/// POI 搜索智能体：maps_text_search
pub fn poi_agent(llm: Arc<dyn LlmClient>, gateway: Arc<ToolGateway>) -> SpecializedAgent {
    SpecializedAgent::new(
        "景点搜索智能体",
        vec!["maps_text_search".to_string()],
        "为{city}的{days}天行程（{start_date}至{end_date}）搜索景点，偏好：{keywords}。\
         调用工具搜索后，列出最值得去的景点并给出一句话推荐理由。",
        llm,
        gateway,
    )
}

/// 天气查询智能体：maps_weather
pub fn weather_agent(llm: Arc<dyn LlmClient>, gateway: Arc<ToolGateway>) -> SpecializedAgent {
    SpecializedAgent::new(
        "天气查询智能体",
        vec!["maps_weather".to_string()],
        "查询{city}在{start_date}至{end_date}期间的天气，并总结对出行安排的影响。",
        llm,
        gateway,
    )
}

/// 酒店推荐智能体：周边搜索为主，文本搜索兜底
pub fn hotel_agent(llm: Arc<dyn LlmClient>, gateway: Arc<ToolGateway>) -> SpecializedAgent {
    SpecializedAgent::new(
        "酒店推荐智能体",
        vec![
            "maps_around_search".to_string(),
            "maps_text_search".to_string(),
        ],
        "为{city}的{days}天行程寻找交通便利的酒店，住宿要求参考用户偏好（{keywords}），\
         给出 2-3 个候选与价位说明。",
        llm,
        gateway,
    )
}
