//! Swallow Web API
//!
//! 启动: cargo run --bin swallow-web --features web
//! POST /api/trip/plan 走完整规划管线；GET /api/poi/search 走直调路径（无模型、低延迟）。

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use swallow::config::load_config;
use swallow::llm::create_llm_from_config;
use swallow::mcp::{HttpToolProvider, ToolGateway};
use swallow::pipeline::{DirectToolInvoker, PipelineOrchestrator, PoiSummary};
use swallow::schema::{TripPlan, TripRequest};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
    invoker: Arc<DirectToolInvoker>,
}

/// 统一响应包装（与前端约定一致）
#[derive(Serialize)]
struct PlanResponse {
    success: bool,
    message: String,
    data: Option<TripPlan>,
}

#[derive(Deserialize)]
struct PoiSearchQuery {
    keywords: String,
    city: String,
}

async fn api_plan_trip(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> (StatusCode, Json<PlanResponse>) {
    match state.orchestrator.plan(&request).await {
        Ok(plan) => (
            StatusCode::OK,
            Json(PlanResponse {
                success: true,
                message: "旅行计划生成成功".to_string(),
                data: Some(plan),
            }),
        ),
        // 唯一到得了这里的失败是兜底构建失败
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PlanResponse {
                success: false,
                message: format!("生成旅行计划失败: {e}"),
                data: None,
            }),
        ),
    }
}

async fn api_poi_search(
    State(state): State<AppState>,
    Query(query): Query<PoiSearchQuery>,
) -> Json<Vec<PoiSummary>> {
    Json(state.invoker.search_poi(&query.keywords, &query.city).await)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swallow::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let amap_key = std::env::var(&cfg.amap.api_key_env).ok();
    let provider = HttpToolProvider::new(
        cfg.amap.endpoint.clone(),
        amap_key,
        cfg.pipeline.tool_timeout_secs,
    )
    .map_err(anyhow::Error::msg)?;

    let gateway = Arc::new(
        ToolGateway::connect(Arc::new(provider), cfg.pipeline.tool_timeout_secs)
            .await
            .context("Tool provider unavailable")?,
    );
    let llm = create_llm_from_config(&cfg);

    let state = AppState {
        orchestrator: Arc::new(PipelineOrchestrator::new(
            llm,
            gateway.clone(),
            &cfg.pipeline,
        )),
        invoker: Arc::new(DirectToolInvoker::new(gateway)),
    };

    let app = Router::new()
        .route("/api/trip/plan", post(api_plan_trip))
        .route("/api/poi/search", get(api_poi_search))
        .with_state(state);

    let addr = std::env::var("SWALLOW_WEB_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    tracing::info!(%addr, "swallow-web listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
