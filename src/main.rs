//! Swallow - 多智能体旅行行程规划
//!
//! 入口：初始化日志、加载配置、连接工具网关，跑一次规划管线并输出计划 JSON。
//!
//! 用法: swallow <城市> [天数] [起始日期 YYYY-MM-DD] [偏好关键词]

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};

use swallow::config::load_config;
use swallow::llm::create_llm_from_config;
use swallow::mcp::{HttpToolProvider, ToolGateway};
use swallow::pipeline::PipelineOrchestrator;
use swallow::schema::TripRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swallow::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let city = args
        .first()
        .cloned()
        .unwrap_or_else(|| "上海".to_string());
    let travel_days: u32 = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3)
        .max(1);
    let start = args
        .get(2)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Local::now().date_naive());
    let end = start + Duration::days(travel_days as i64 - 1);
    let preferences: Vec<String> = args.get(3).cloned().into_iter().collect();

    let request = TripRequest {
        city,
        start_date: start.format("%Y-%m-%d").to_string(),
        end_date: end.format("%Y-%m-%d").to_string(),
        travel_days,
        preferences,
        budget: None,
        transportation: None,
        accommodation: None,
    };

    let amap_key = std::env::var(&cfg.amap.api_key_env).ok();
    let provider = HttpToolProvider::new(
        cfg.amap.endpoint.clone(),
        amap_key,
        cfg.pipeline.tool_timeout_secs,
    )
    .map_err(anyhow::Error::msg)
    .context("Failed to build tool provider")?;

    let gateway = Arc::new(
        ToolGateway::connect(Arc::new(provider), cfg.pipeline.tool_timeout_secs)
            .await
            .context("Tool provider unavailable")?,
    );
    let llm = create_llm_from_config(&cfg);

    let orchestrator = PipelineOrchestrator::new(llm.clone(), gateway, &cfg.pipeline);
    let plan = orchestrator
        .plan(&request)
        .await
        .context("Plan generation failed")?;

    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
    tracing::info!(
        prompt_tokens,
        completion_tokens,
        total_tokens,
        "llm_usage"
    );

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
