//! 规划管线集成测试
//!
//! 用 Stub 工具提供方 + Scripted LLM 跑整条管线，覆盖：
//! 正常解析、酒店工具超时降级、解析失败转兜底、LLM 全挂仍产出合法计划。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use swallow::config::PipelineSection;
use swallow::llm::ScriptedLlmClient;
use swallow::mcp::{RawTool, ToolGateway, ToolProvider};
use swallow::pipeline::PipelineOrchestrator;
use swallow::schema::{validate_trip_plan, TripRequest};

/// 单个工具的脚本行为
#[derive(Clone)]
enum ToolBehavior {
    Reply(Value),
    Fail(String),
    /// 延迟后才回复，用于触发网关超时
    Delay(Duration, Value),
}

struct ScenarioProvider {
    tools: Vec<RawTool>,
    behaviors: HashMap<String, ToolBehavior>,
}

#[async_trait]
impl ToolProvider for ScenarioProvider {
    async fn list_tools(&self) -> Result<Vec<RawTool>, String> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> Result<Value, String> {
        match self.behaviors.get(name) {
            Some(ToolBehavior::Reply(v)) => Ok(v.clone()),
            Some(ToolBehavior::Fail(e)) => Err(e.clone()),
            Some(ToolBehavior::Delay(d, v)) => {
                tokio::time::sleep(*d).await;
                Ok(v.clone())
            }
            None => Err(format!("no behavior scripted for {name}")),
        }
    }
}

fn amap_tools() -> Vec<RawTool> {
    let tool = |name: &str, required: Vec<&str>| RawTool {
        name: name.to_string(),
        description: Some(format!("{name} 工具")),
        input_schema: Some(json!({
            "type": "object",
            "properties": required.iter().map(|r| (r.to_string(), json!({"type": "string"}))).collect::<serde_json::Map<_, _>>(),
            "required": required,
        })),
    };
    vec![
        tool("maps_text_search", vec!["keywords", "city"]),
        tool("maps_weather", vec!["city"]),
        tool("maps_around_search", vec!["keywords"]),
    ]
}

fn poi_payload() -> Value {
    json!({
        "pois": [
            {"id": "B01", "name": "豫园", "address": "安仁街218号", "location": "121.492,31.227", "type": "风景名胜"},
            {"id": "B02", "name": "外滩", "address": "中山东一路", "location": "121.490,31.236", "type": "风景名胜"},
            {"id": "B03", "name": "田子坊", "address": "泰康路210弄", "location": "121.469,31.210", "type": "风景名胜"},
            {"id": "B04", "name": "武康路", "address": "徐汇区", "location": "121.437,31.207", "type": "风景名胜"}
        ]
    })
}

fn weather_payload() -> Value {
    json!({
        "forecasts": [
            {"date": "2026-05-01", "dayweather": "晴", "daytemp": "22", "nighttemp": "14"},
            {"date": "2026-05-02", "dayweather": "多云", "daytemp": "21", "nighttemp": "13"},
            {"date": "2026-05-03", "dayweather": "小雨", "daytemp": "18", "nighttemp": "12"}
        ]
    })
}

fn shanghai_request() -> TripRequest {
    TripRequest {
        city: "上海".to_string(),
        start_date: "2026-05-01".to_string(),
        end_date: "2026-05-03".to_string(),
        travel_days: 3,
        preferences: vec!["历史古迹".to_string()],
        budget: Some(3000.0),
        transportation: Some("地铁".to_string()),
        accommodation: None,
    }
}

fn test_pipeline_cfg() -> PipelineSection {
    PipelineSection {
        tool_timeout_secs: 1,
        stage_timeout_secs: 3,
        total_deadline_secs: 30,
        concurrent_agents: false,
    }
}

async fn gateway_with(behaviors: HashMap<String, ToolBehavior>) -> Arc<ToolGateway> {
    let provider = Arc::new(ScenarioProvider {
        tools: amap_tools(),
        behaviors,
    });
    Arc::new(ToolGateway::connect(provider, 1).await.unwrap())
}

fn planner_json() -> String {
    json!({
        "city": "上海",
        "start_date": "2026-05-01",
        "end_date": "2026-05-03",
        "days": [
            {
                "date": "2026-05-01",
                "day_index": 0,
                "description": "老城厢与外滩",
                "attractions": [{"name": "豫园", "address": "安仁街218号", "location": {"longitude": 121.492, "latitude": 31.227}, "visit_duration": 150, "description": "江南园林", "category": "景点", "poi_id": "B01"}],
                "meals": [{"type": "lunch", "name": "南翔馒头店", "description": "小笼包", "estimated_cost": 60}],
                "hotel": {"name": "外滩酒店", "address": "中山东一路", "price_range": "600-800"},
                "weather": {"date": "2026-05-01", "weather": "晴", "temperature": "14~22°C", "wind": null}
            },
            {"date": "2026-05-02", "day_index": 1, "description": "法租界漫步", "attractions": [], "meals": [], "hotel": null, "weather": null},
            {"date": "2026-05-03", "day_index": 2, "description": "田子坊", "attractions": [], "meals": [], "hotel": null, "weather": null}
        ],
        "overall_suggestions": "五一客流大，热门景点建议提前预约。",
        "budget": 2800
    })
    .to_string()
}

#[tokio::test]
async fn happy_path_returns_parsed_plan() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Reply(poi_payload()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    behaviors.insert(
        "maps_around_search".to_string(),
        ToolBehavior::Reply(json!({"pois": [{"id": "H01", "name": "外滩酒店", "location": "121.49,31.23"}]})),
    );
    let gateway = gateway_with(behaviors).await;

    let llm = Arc::new(ScriptedLlmClient::new([
        "TOOL_CALL:maps_text_search:keywords=历史古迹,city=上海".to_string(),
        "TOOL_CALL:maps_weather:city=上海".to_string(),
        "TOOL_CALL:maps_around_search:keywords=酒店".to_string(),
        format!("```json\n{}\n```\n以上是完整行程。", planner_json()),
    ]));

    let orchestrator = PipelineOrchestrator::new(llm, gateway, &test_pipeline_cfg());
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();

    assert!(validate_trip_plan(&plan).is_ok());
    assert_eq!(plan.days.len(), 3);
    assert_eq!(plan.days[0].attractions[0].name, "豫园");
    assert_eq!(plan.days[0].hotel.as_ref().unwrap().name, "外滩酒店");
    assert_eq!(plan.overall_suggestions, "五一客流大，热门景点建议提前预约。");
}

#[tokio::test]
async fn hotel_tool_timeout_degrades_to_fallback_with_poi_and_weather() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Reply(poi_payload()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    // 超过网关 1s 超时
    behaviors.insert(
        "maps_around_search".to_string(),
        ToolBehavior::Delay(Duration::from_secs(5), Value::Null),
    );
    let gateway = gateway_with(behaviors).await;

    // 规划合成输出无法解析，强制走兜底路径
    let llm = Arc::new(ScriptedLlmClient::new([
        "TOOL_CALL:maps_text_search:keywords=历史古迹,city=上海",
        "TOOL_CALL:maps_weather:city=上海",
        "TOOL_CALL:maps_around_search:keywords=酒店",
        "抱歉，我无法输出 JSON。",
    ]));

    let orchestrator = PipelineOrchestrator::new(llm, gateway, &test_pipeline_cfg());
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();

    assert!(validate_trip_plan(&plan).is_ok());
    assert_eq!(plan.days.len(), 3);
    // POI 与天气来自成功的工具负载
    assert!(!plan.days[0].attractions.is_empty());
    assert_eq!(plan.days[0].weather.as_ref().unwrap().weather, "晴");
    // 酒店阶段超时，占位为空
    assert!(plan.days.iter().all(|d| d.hotel.is_none()));
}

#[tokio::test]
async fn single_tool_failure_still_yields_valid_plan() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Fail("quota exceeded".to_string()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    behaviors.insert(
        "maps_around_search".to_string(),
        ToolBehavior::Reply(json!({"pois": []})),
    );
    let gateway = gateway_with(behaviors).await;

    let llm = Arc::new(ScriptedLlmClient::new([
        "TOOL_CALL:maps_text_search:keywords=历史古迹,city=上海",
        "TOOL_CALL:maps_weather:city=上海",
        "TOOL_CALL:maps_around_search:keywords=酒店",
        "没有足够数据，无法给出结构化行程。",
    ]));

    let orchestrator = PipelineOrchestrator::new(llm, gateway, &test_pipeline_cfg());
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();
    assert!(validate_trip_plan(&plan).is_ok());
    assert_eq!(plan.days.len(), 3);
}

#[tokio::test]
async fn llm_service_down_still_yields_valid_fallback() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Reply(poi_payload()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    behaviors.insert("maps_around_search".to_string(), ToolBehavior::Reply(Value::Null));
    let gateway = gateway_with(behaviors).await;

    let llm = Arc::new(ScriptedLlmClient::always_failing("connection refused"));
    let orchestrator = PipelineOrchestrator::new(llm, gateway, &test_pipeline_cfg());
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();

    // 所有智能体降级，兜底计划仍然 schema 合法且天数完整
    assert!(validate_trip_plan(&plan).is_ok());
    assert_eq!(plan.days.len(), 3);
    assert!(plan.days.iter().all(|d| !d.meals.is_empty()));
}

#[tokio::test]
async fn concurrent_agents_join_before_synthesis() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Reply(poi_payload()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    behaviors.insert("maps_around_search".to_string(), ToolBehavior::Reply(Value::Null));
    let gateway = gateway_with(behaviors).await;

    // 并发模式下回复顺序不可预期：用不含指令的统一回复，只验证 join 屏障与兜底契约
    let llm = Arc::new(ScriptedLlmClient::new(["本阶段无需调用工具。"]));
    let cfg = PipelineSection {
        concurrent_agents: true,
        ..test_pipeline_cfg()
    };
    let orchestrator = PipelineOrchestrator::new(llm, gateway, &cfg);
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();
    assert!(validate_trip_plan(&plan).is_ok());
    assert_eq!(plan.days.len(), 3);
}

#[tokio::test]
async fn planner_directive_is_ignored_not_executed() {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        "maps_text_search".to_string(),
        ToolBehavior::Reply(poi_payload()),
    );
    behaviors.insert(
        "maps_weather".to_string(),
        ToolBehavior::Reply(weather_payload()),
    );
    behaviors.insert("maps_around_search".to_string(), ToolBehavior::Reply(Value::Null));
    let gateway = gateway_with(behaviors).await;

    // 规划智能体违约输出指令：解析器应忽略并（因无 JSON）转兜底，而不是执行工具
    let llm = Arc::new(ScriptedLlmClient::new([
        "TOOL_CALL:maps_text_search:keywords=历史古迹,city=上海",
        "TOOL_CALL:maps_weather:city=上海",
        "TOOL_CALL:maps_around_search:keywords=酒店",
        "TOOL_CALL:maps_weather:city=上海",
    ]));

    let orchestrator = PipelineOrchestrator::new(llm, gateway, &test_pipeline_cfg());
    let plan = orchestrator.plan(&shanghai_request()).await.unwrap();
    assert!(validate_trip_plan(&plan).is_ok());
}
