//! 规划合成智能体
//!
//! 不持有任何工具访问权：只消费三个专项智能体的原始输出，产出一段
//! 必须只含 TripPlan JSON 对象（可包 ```json 围栏）的文本。
//! 若其输出夹带工具调用指令，属于模板违约，由解析器忽略而非执行。

use std::sync::Arc;

use crate::agents::specialized::AgentTurnOutput;
use crate::error::PlanError;
use crate::llm::{LlmClient, Message};
use crate::schema::TripRequest;

/// 单条工具负载拼进上下文的最大字符数，防止 POI 原始结果撑爆 prompt
const TOOL_PAYLOAD_MAX_CHARS: usize = 4000;

pub struct PlannerAgent {
    llm: Arc<dyn LlmClient>,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 合成最终行程：三个专项输出作为上下文，要求模型只输出 TripPlan JSON
    pub async fn synthesize(
        &self,
        outputs: &[AgentTurnOutput],
        request: &TripRequest,
    ) -> Result<String, PlanError> {
        let mut context = String::new();
        for out in outputs {
            context.push_str(&format!("## {} 的输出\n", out.role));
            if !out.raw_text.is_empty() {
                context.push_str(out.raw_text.trim());
                context.push('\n');
            }
            match &out.tool_result {
                Some(r) if r.ok => {
                    let payload = truncate(&r.payload.to_string(), TOOL_PAYLOAD_MAX_CHARS);
                    context.push_str(&format!("工具返回数据：{payload}\n"));
                }
                Some(r) => {
                    context.push_str(&format!(
                        "工具调用失败：{}\n",
                        r.error.as_deref().unwrap_or("unknown")
                    ));
                }
                None => context.push_str("（本阶段无工具结果）\n"),
            }
            context.push('\n');
        }

        let user_prompt = format!(
            "请根据以上信息为用户生成{city}的{days}天行程（{start}至{end}）。\n\n{context}",
            city = request.city,
            days = request.travel_days,
            start = request.start_date,
            end = request.end_date,
            context = context,
        );

        let messages = [Message::system(SYNTHESIS_PROMPT), Message::user(user_prompt)];
        self.llm
            .complete(&messages)
            .await
            .map_err(PlanError::LlmError)
    }
}

/// 合成提示词：只输出 JSON，schema 与 TripPlan 一一对应
const SYNTHESIS_PROMPT: &str = r#"你是行程合成器。输出必须是且仅是一个 JSON 对象（可以包在 ```json 代码块中），不得附加任何解释文字，不得调用工具。JSON 结构：
{
  "city": "城市",
  "start_date": "YYYY-MM-DD",
  "end_date": "YYYY-MM-DD",
  "days": [
    {
      "date": "YYYY-MM-DD",
      "day_index": 0,
      "description": "当日概述",
      "attractions": [{"name": "...", "address": "...", "location": {"longitude": 0, "latitude": 0}, "visit_duration": 120, "description": "...", "category": "景点", "poi_id": null}],
      "meals": [{"type": "breakfast|lunch|dinner", "name": "...", "description": "...", "estimated_cost": 0}],
      "hotel": {"name": "...", "address": "...", "price_range": "..."},
      "weather": {"date": "YYYY-MM-DD", "weather": "...", "temperature": "...", "wind": "..."},
      "budget": null
    }
  ],
  "overall_suggestions": "整体建议",
  "budget": null
}
days 不得为空；缺少的数据用 null 或空数组，不要编造坐标。"#;

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
