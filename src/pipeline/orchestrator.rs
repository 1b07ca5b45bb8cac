//! 规划管线编排器
//!
//! 状态机：Started -> PoiQuerying -> WeatherQuerying -> HotelQuerying ->
//! Synthesizing -> Parsing -> Done / DoneFallback。
//! 任一阶段超时或失败都以空产出继续（degrade-not-fail）；只有兜底计划
//! 本身不合法才以 FallbackBuildFailed 终止。三个专项阶段默认顺序执行，
//! 可通过配置开关并发，合成阶段始终等待三者全部结束（join 屏障）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::{
    fallback, hotel_agent, parser, planner::PlannerAgent, poi_agent, weather_agent,
    AgentTurnOutput, SpecializedAgent,
};
use crate::config::PipelineSection;
use crate::error::PlanError;
use crate::llm::LlmClient;
use crate::mcp::ToolGateway;
use crate::schema::{validate_trip_plan, TripPlan, TripRequest};

/// 管线阶段（审计日志与计时用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Started,
    PoiQuerying,
    WeatherQuerying,
    HotelQuerying,
    Synthesizing,
    Parsing,
    Done,
    DoneFallback,
}

impl PipelineStage {
    fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Started => "started",
            PipelineStage::PoiQuerying => "poi_querying",
            PipelineStage::WeatherQuerying => "weather_querying",
            PipelineStage::HotelQuerying => "hotel_querying",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Done => "done",
            PipelineStage::DoneFallback => "done_fallback",
        }
    }
}

/// 单次运行的上下文：请求参数、已收集产出、阶段计时；运行结束即弃
struct PipelineRunContext {
    run_id: Uuid,
    outputs: Vec<AgentTurnOutput>,
    stage_timings: Vec<(PipelineStage, u64)>,
}

impl PipelineRunContext {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            outputs: Vec::with_capacity(4),
            stage_timings: Vec::new(),
        }
    }

    fn record(&mut self, stage: PipelineStage, elapsed: Duration) {
        self.stage_timings
            .push((stage, elapsed.as_millis() as u64));
    }
}

/// 管线编排器：三个专项智能体 + 规划合成智能体共享一个 LLM 与一个工具网关
pub struct PipelineOrchestrator {
    poi: SpecializedAgent,
    weather: SpecializedAgent,
    hotel: SpecializedAgent,
    planner: PlannerAgent,
    stage_timeout: Duration,
    total_deadline: Duration,
    concurrent_agents: bool,
}

impl PipelineOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<ToolGateway>,
        cfg: &PipelineSection,
    ) -> Self {
        Self {
            poi: poi_agent(llm.clone(), gateway.clone()),
            weather: weather_agent(llm.clone(), gateway.clone()),
            hotel: hotel_agent(llm.clone(), gateway),
            planner: PlannerAgent::new(llm),
            stage_timeout: Duration::from_secs(cfg.stage_timeout_secs),
            total_deadline: Duration::from_secs(cfg.total_deadline_secs),
            concurrent_agents: cfg.concurrent_agents,
        }
    }

    /// 规划入口：总是返回 schema 合法的 TripPlan，或唯一致命错误 FallbackBuildFailed
    pub async fn plan(&self, request: &TripRequest) -> Result<TripPlan, PlanError> {
        self.plan_with_cancel(request, CancellationToken::new()).await
    }

    /// 带外部取消令牌的规划入口：取消视同截止到期，仍返回兜底计划而非空手而归
    pub async fn plan_with_cancel(
        &self,
        request: &TripRequest,
        cancel: CancellationToken,
    ) -> Result<TripPlan, PlanError> {
        let deadline = Instant::now() + self.total_deadline;
        let mut ctx = PipelineRunContext::new();
        tracing::info!(
            run_id = %ctx.run_id,
            city = %request.city,
            days = request.travel_days,
            concurrent = self.concurrent_agents,
            "pipeline started"
        );

        if self.concurrent_agents {
            self.run_agents_concurrent(request, deadline, &cancel, &mut ctx)
                .await;
        } else {
            self.run_agents_sequential(request, deadline, &cancel, &mut ctx)
                .await;
        }

        // 合成阶段：截止已过或被取消则直接兜底
        let raw = if Instant::now() >= deadline || cancel.is_cancelled() {
            tracing::warn!(run_id = %ctx.run_id, "deadline reached before synthesis, going fallback");
            None
        } else {
            let start = Instant::now();
            let bound = stage_bound(self.stage_timeout, deadline);
            let result = tokio::select! {
                _ = cancel.cancelled() => None,
                r = timeout(bound, self.planner.synthesize(&ctx.outputs, request)) => match r {
                    Ok(Ok(text)) => Some(text),
                    Ok(Err(e)) => {
                        tracing::warn!(run_id = %ctx.run_id, error = %e, "synthesis failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(run_id = %ctx.run_id, "synthesis timed out");
                        None
                    }
                },
            };
            ctx.record(PipelineStage::Synthesizing, start.elapsed());
            result
        };

        // 解析阶段：失败是契约内分支，转兜底
        let (plan, outcome) = match raw {
            Some(text) => {
                let start = Instant::now();
                let parsed = parser::parse(&text);
                ctx.record(PipelineStage::Parsing, start.elapsed());
                match parsed {
                    Ok(plan) => (plan, PipelineStage::Done),
                    Err(e) => {
                        tracing::warn!(run_id = %ctx.run_id, error = %e, "parse failed, going fallback");
                        (
                            fallback::build(&ctx.outputs, request),
                            PipelineStage::DoneFallback,
                        )
                    }
                }
            }
            None => (
                fallback::build(&ctx.outputs, request),
                PipelineStage::DoneFallback,
            ),
        };

        // 兜底计划也必须满足输出契约——违反即管线唯一的运行期致命错误
        if outcome == PipelineStage::DoneFallback {
            validate_trip_plan(&plan).map_err(PlanError::FallbackBuildFailed)?;
        }

        let timings: Vec<serde_json::Value> = ctx
            .stage_timings
            .iter()
            .map(|(s, ms)| serde_json::json!({"stage": s.as_str(), "ms": ms}))
            .collect();
        let audit = serde_json::json!({
            "event": "pipeline_audit",
            "run_id": ctx.run_id.to_string(),
            "outcome": outcome.as_str(),
            "stages": timings,
        });
        tracing::info!(audit = %audit.to_string(), "pipeline");

        Ok(plan)
    }

    /// 顺序执行三个专项阶段（默认，与上游实现一致）
    async fn run_agents_sequential(
        &self,
        request: &TripRequest,
        deadline: Instant,
        cancel: &CancellationToken,
        ctx: &mut PipelineRunContext,
    ) {
        let stages: [(&SpecializedAgent, PipelineStage); 3] = [
            (&self.poi, PipelineStage::PoiQuerying),
            (&self.weather, PipelineStage::WeatherQuerying),
            (&self.hotel, PipelineStage::HotelQuerying),
        ];
        for (agent, stage) in stages {
            let start = Instant::now();
            let out = run_stage(agent, request, stage_bound(self.stage_timeout, deadline), cancel)
                .await;
            ctx.record(stage, start.elapsed());
            ctx.outputs.push(out);
        }
    }

    /// 并发执行三个专项阶段；join 保证合成阶段看到全部三个产出（完成或降级）
    async fn run_agents_concurrent(
        &self,
        request: &TripRequest,
        deadline: Instant,
        cancel: &CancellationToken,
        ctx: &mut PipelineRunContext,
    ) {
        let bound = stage_bound(self.stage_timeout, deadline);
        let start = Instant::now();
        let (poi, weather, hotel) = tokio::join!(
            run_stage(&self.poi, request, bound, cancel),
            run_stage(&self.weather, request, bound, cancel),
            run_stage(&self.hotel, request, bound, cancel),
        );
        let elapsed = start.elapsed();
        ctx.record(PipelineStage::PoiQuerying, elapsed);
        ctx.record(PipelineStage::WeatherQuerying, elapsed);
        ctx.record(PipelineStage::HotelQuerying, elapsed);
        ctx.outputs.extend([poi, weather, hotel]);
    }
}

/// 阶段超时上限：不超过剩余总截止时间
fn stage_bound(stage_timeout: Duration, deadline: Instant) -> Duration {
    stage_timeout.min(deadline.saturating_duration_since(Instant::now()))
}

/// 跑单个专项阶段：超时或取消都折叠为空产出，管线继续
async fn run_stage(
    agent: &SpecializedAgent,
    request: &TripRequest,
    bound: Duration,
    cancel: &CancellationToken,
) -> AgentTurnOutput {
    if bound.is_zero() {
        tracing::warn!(role = %agent.role(), "no time budget left, skipping stage");
        return AgentTurnOutput::empty(agent.role());
    }
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::warn!(role = %agent.role(), "stage cancelled, degrading");
            AgentTurnOutput::empty(agent.role())
        }
        r = timeout(bound, agent.run(request)) => match r {
            Ok(out) => out,
            Err(_) => {
                tracing::warn!(role = %agent.role(), "stage timed out, degrading");
                AgentTurnOutput::empty(agent.role())
            }
        },
    }
}
