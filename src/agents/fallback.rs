//! 兜底计划构建
//!
//! 当结构化解析失败或管线整体超时时，用手头可用的工具负载拼一个
//! schema 合法的 TripPlan：POI 能捞多少捞多少，缺的数据用显式占位值。
//! 必须永不失败——数据全缺也要产出至少一天的占位行程。

use chrono::{Duration, Local, NaiveDate};
use serde_json::Value;

use crate::agents::specialized::AgentTurnOutput;
use crate::mcp::ToolInvocationResult;
use crate::schema::{
    Attraction, DayPlan, Location, Meal, TripPlan, TripRequest, WeatherInfo,
};

/// 占位描述：调用方可据此辨别降级内容（契约不单独暴露 partial 状态）
pub const PLACEHOLDER_NOTE: &str = "数据暂缺";

/// 兜底行程天数上限：异常大的 travel_days 钳制到此值，避免撑爆内存分配与日期运算
pub const MAX_TRIP_DAYS: u32 = 30;

/// 从可用的智能体产出构建兜底行程
pub fn build(outputs: &[AgentTurnOutput], request: &TripRequest) -> TripPlan {
    let pois = outputs
        .iter()
        .filter_map(|o| o.tool_result.as_ref())
        .filter(|r| r.ok)
        .filter_map(scavenge_pois)
        .next()
        .unwrap_or_default();

    let forecasts = outputs
        .iter()
        .filter_map(|o| o.tool_result.as_ref())
        .filter(|r| r.ok)
        .filter_map(scavenge_weather)
        .next()
        .unwrap_or_default();

    let days_count = request.travel_days.clamp(1, MAX_TRIP_DAYS) as usize;
    // 每天 2-3 个 POI，与上游实现一致
    let per_day = if days_count == 1 { 3 } else { 2 };

    let start = NaiveDate::parse_from_str(&request.start_date, "%Y-%m-%d")
        .unwrap_or_else(|_| Local::now().date_naive());

    let mut days = Vec::with_capacity(days_count);
    let mut idx = 0usize;
    for day_index in 0..days_count {
        let date = (start + Duration::days(day_index as i64))
            .format("%Y-%m-%d")
            .to_string();

        let mut day_pois: Vec<Attraction> = pois.iter().skip(idx).take(per_day).cloned().collect();
        if day_pois.is_empty() && !pois.is_empty() {
            day_pois = pois.iter().take(per_day).cloned().collect();
        }
        idx += per_day;

        let description = if day_pois.is_empty() {
            format!("第{}天行程（{PLACEHOLDER_NOTE}）", day_index + 1)
        } else {
            format!("第{}天行程（基于POI搜索：{}）", day_index + 1, request.poi_keywords())
        };

        let weather = forecasts.iter().find(|w| w.date == date).cloned();

        days.push(DayPlan {
            date,
            day_index: day_index as u32,
            description,
            attractions: day_pois,
            meals: placeholder_meals(),
            hotel: None,
            weather,
            budget: None,
        });
    }

    TripPlan {
        city: request.city.clone(),
        start_date: request.start_date.clone(),
        end_date: request.end_date.clone(),
        days,
        overall_suggestions: format!(
            "本行程为降级生成：部分上游数据{PLACEHOLDER_NOTE}，建议出行前复核景点开放时间与天气。"
        ),
        budget: request.budget,
    }
}

/// 从工具负载中捞 POI 列表；高德常见三种形态：{"pois": [...]}、{"data": {"pois": [...]}}、裸数组
fn scavenge_pois(result: &ToolInvocationResult) -> Option<Vec<Attraction>> {
    let data = &result.payload;
    let items = data
        .get("pois")
        .and_then(|p| p.as_array())
        .or_else(|| {
            data.get("data")
                .and_then(|d| d.get("pois"))
                .and_then(|p| p.as_array())
        })
        .or_else(|| data.as_array())?;

    let attractions: Vec<Attraction> = items
        .iter()
        .filter_map(poi_to_attraction)
        .take(15)
        .collect();

    if attractions.is_empty() {
        None
    } else {
        Some(attractions)
    }
}

fn poi_to_attraction(item: &Value) -> Option<Attraction> {
    let obj = item.as_object()?;
    let name = obj.get("name").and_then(|n| n.as_str())?;
    let address = obj
        .get("address")
        .and_then(|a| a.as_str())
        .unwrap_or_default();
    let location = obj
        .get("location")
        .and_then(|l| l.as_str())
        .and_then(Location::parse);
    let poi_type = obj.get("type").and_then(|t| t.as_str()).unwrap_or_default();

    Some(Attraction {
        name: name.to_string(),
        address: address.to_string(),
        location,
        visit_duration: 120,
        description: if poi_type.is_empty() {
            "来自POI搜索".to_string()
        } else {
            format!("来自POI搜索: {poi_type}")
        },
        category: "景点".to_string(),
        poi_id: obj
            .get("id")
            .and_then(|i| i.as_str())
            .map(|s| s.to_string()),
    })
}

/// 从天气负载中捞逐日预报：{"forecasts": [{"date", "dayweather", "daytemp"/"nighttemp", "daywind"}]}
fn scavenge_weather(result: &ToolInvocationResult) -> Option<Vec<WeatherInfo>> {
    let forecasts = result
        .payload
        .get("forecasts")
        .and_then(|f| f.as_array())
        .or_else(|| {
            result
                .payload
                .get("data")
                .and_then(|d| d.get("forecasts"))
                .and_then(|f| f.as_array())
        })?;

    let infos: Vec<WeatherInfo> = forecasts
        .iter()
        .filter_map(|f| {
            let obj = f.as_object()?;
            let date = obj.get("date").and_then(|d| d.as_str())?;
            let weather = obj
                .get("dayweather")
                .or_else(|| obj.get("weather"))
                .and_then(|w| w.as_str())
                .unwrap_or_default();
            let temperature = match (
                obj.get("nighttemp").and_then(|t| t.as_str()),
                obj.get("daytemp").and_then(|t| t.as_str()),
            ) {
                (Some(lo), Some(hi)) => format!("{lo}~{hi}°C"),
                _ => obj
                    .get("temperature")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string(),
            };
            Some(WeatherInfo {
                date: date.to_string(),
                weather: weather.to_string(),
                temperature,
                wind: obj
                    .get("daywind")
                    .and_then(|w| w.as_str())
                    .map(|s| s.to_string()),
            })
        })
        .collect();

    if infos.is_empty() {
        None
    } else {
        Some(infos)
    }
}

/// 占位三餐，费用估算与上游一致（30/50/80）
fn placeholder_meals() -> Vec<Meal> {
    vec![
        Meal {
            meal_type: "breakfast".to_string(),
            name: "早餐推荐".to_string(),
            description: "根据当前位置/景点分布选择附近餐饮".to_string(),
            estimated_cost: Some(30.0),
        },
        Meal {
            meal_type: "lunch".to_string(),
            name: "午餐推荐".to_string(),
            description: "根据行程中途位置选择附近餐饮".to_string(),
            estimated_cost: Some(50.0),
        },
        Meal {
            meal_type: "dinner".to_string(),
            name: "晚餐推荐".to_string(),
            description: "根据当日结束点选择附近餐饮".to_string(),
            estimated_cost: Some(80.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate_trip_plan, TripRequest};
    use serde_json::json;

    fn request(days: u32) -> TripRequest {
        TripRequest {
            city: "上海".to_string(),
            start_date: "2026-05-01".to_string(),
            end_date: "2026-05-03".to_string(),
            travel_days: days,
            preferences: vec!["历史古迹".to_string()],
            budget: Some(3000.0),
            transportation: None,
            accommodation: None,
        }
    }

    fn poi_output() -> AgentTurnOutput {
        AgentTurnOutput {
            role: "poi".to_string(),
            raw_text: String::new(),
            tool_result: Some(ToolInvocationResult::success(json!({
                "pois": [
                    {"id": "B001", "name": "豫园", "address": "安仁街218号", "location": "121.492,31.227", "type": "风景名胜"},
                    {"id": "B002", "name": "外滩", "address": "中山东一路", "location": "121.490,31.236", "type": "风景名胜"},
                    {"id": "B003", "name": "田子坊", "address": "泰康路210弄", "location": "121.469,31.210", "type": "风景名胜"}
                ]
            }))),
        }
    }

    #[test]
    fn builds_valid_plan_with_no_outputs_at_all() {
        let plan = build(&[], &request(3));
        assert!(validate_trip_plan(&plan).is_ok());
        assert_eq!(plan.days.len(), 3);
        assert_eq!(plan.days[1].date, "2026-05-02");
        assert!(plan.days[0].attractions.is_empty());
        assert!(plan.overall_suggestions.contains(PLACEHOLDER_NOTE));
    }

    #[test]
    fn zero_day_request_still_yields_one_day() {
        let plan = build(&[], &request(0));
        assert_eq!(plan.days.len(), 1);
        assert!(validate_trip_plan(&plan).is_ok());
    }

    #[test]
    fn huge_travel_days_is_clamped_not_aborted() {
        let plan = build(&[poi_output()], &request(200_000_000));
        assert_eq!(plan.days.len(), MAX_TRIP_DAYS as usize);
        assert_eq!(plan.days.last().unwrap().date, "2026-05-30");
        assert!(validate_trip_plan(&plan).is_ok());
    }

    #[test]
    fn scavenges_pois_into_days() {
        let plan = build(&[poi_output()], &request(2));
        assert_eq!(plan.days[0].attractions.len(), 2);
        assert_eq!(plan.days[0].attractions[0].name, "豫园");
        let loc = plan.days[0].attractions[0].location.unwrap();
        assert!((loc.longitude - 121.492).abs() < 1e-9);
        // 第二天拿到剩余 POI
        assert_eq!(plan.days[1].attractions[0].name, "田子坊");
    }

    #[test]
    fn scavenges_weather_forecasts_by_date() {
        let weather = AgentTurnOutput {
            role: "weather".to_string(),
            raw_text: String::new(),
            tool_result: Some(ToolInvocationResult::success(json!({
                "forecasts": [
                    {"date": "2026-05-01", "dayweather": "晴", "daytemp": "22", "nighttemp": "12", "daywind": "东南"},
                    {"date": "2026-05-02", "dayweather": "多云", "daytemp": "20", "nighttemp": "13"}
                ]
            }))),
        };
        let plan = build(&[weather], &request(2));
        let w = plan.days[0].weather.as_ref().unwrap();
        assert_eq!(w.weather, "晴");
        assert_eq!(w.temperature, "12~22°C");
        assert!(plan.days[1].weather.is_some());
    }

    #[test]
    fn failed_tool_results_are_ignored() {
        let failed = AgentTurnOutput {
            role: "poi".to_string(),
            raw_text: String::new(),
            tool_result: Some(ToolInvocationResult::failure("timeout")),
        };
        let plan = build(&[failed], &request(1));
        assert!(plan.days[0].attractions.is_empty());
        assert!(validate_trip_plan(&plan).is_ok());
    }
}
