//! 行程规划数据模型
//!
//! TripRequest 为管线入口参数，TripPlan 为唯一对外输出 schema。
//! 不论解析成功还是走兜底路径，返回值都必须满足 validate_trip_plan。

use serde::{Deserialize, Serialize};

/// 经纬度坐标（高德格式："lng,lat" 解析后）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

impl Location {
    /// 解析高德常见坐标串 "116.397,39.909"；格式不符返回 None
    pub fn parse(text: &str) -> Option<Self> {
        let (lng, lat) = text.split_once(',')?;
        Some(Self {
            longitude: lng.trim().parse().ok()?,
            latitude: lat.trim().parse().ok()?,
        })
    }
}

/// 旅行规划请求（由路由层传入，字段语义与前端表单一致）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    /// 目的地城市
    pub city: String,
    /// 起始日期，格式 YYYY-MM-DD
    pub start_date: String,
    /// 结束日期，格式 YYYY-MM-DD
    pub end_date: String,
    /// 行程天数（>= 1）
    pub travel_days: u32,
    /// 偏好关键词（如 "历史古迹" / "美食"），第一个用作 POI 搜索关键词
    #[serde(default)]
    pub preferences: Vec<String>,
    /// 预算（元），可选
    #[serde(default)]
    pub budget: Option<f64>,
    /// 市内交通方式
    #[serde(default)]
    pub transportation: Option<String>,
    /// 住宿要求
    #[serde(default)]
    pub accommodation: Option<String>,
}

impl TripRequest {
    /// POI 搜索关键词：取第一个偏好，否则用"景点"
    pub fn poi_keywords(&self) -> &str {
        self.preferences
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("景点")
    }
}

/// 景点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub location: Option<Location>,
    /// 建议游玩时长（分钟）
    #[serde(default = "default_visit_duration")]
    pub visit_duration: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// 高德 POI ID，用于前端地图定位
    #[serde(default)]
    pub poi_id: Option<String>,
}

fn default_visit_duration() -> u32 {
    120
}

fn default_category() -> String {
    "景点".to_string()
}

/// 一餐（breakfast / lunch / dinner）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    #[serde(rename = "type")]
    pub meal_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
}

/// 酒店
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub price_range: Option<String>,
}

/// 单日天气
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherInfo {
    #[serde(default)]
    pub date: String,
    /// 天气现象（晴/多云/小雨…）
    #[serde(default)]
    pub weather: String,
    /// 温度描述（如 "12~22°C"）
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub wind: Option<String>,
}

/// 单日行程
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    /// 日期 YYYY-MM-DD
    pub date: String,
    /// 第几天（从 0 起）
    #[serde(default)]
    pub day_index: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attractions: Vec<Attraction>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub hotel: Option<Hotel>,
    #[serde(default)]
    pub weather: Option<WeatherInfo>,
    /// 当日预算（元）
    #[serde(default)]
    pub budget: Option<f64>,
}

/// 完整行程计划——管线唯一输出 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub city: String,
    pub start_date: String,
    pub end_date: String,
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub overall_suggestions: String,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// 校验 TripPlan 是否满足输出契约：days 非空、每天有日期。
/// ResponseParser 的每次解析尝试与兜底计划都必须通过本校验。
pub fn validate_trip_plan(plan: &TripPlan) -> Result<(), String> {
    if plan.city.is_empty() {
        return Err("city is empty".to_string());
    }
    if plan.days.is_empty() {
        return Err("days is empty".to_string());
    }
    for (i, day) in plan.days.iter().enumerate() {
        if day.date.is_empty() {
            return Err(format!("day {} has empty date", i));
        }
    }
    Ok(())
}
