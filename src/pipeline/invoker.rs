//! 直接工具调用方
//!
//! 不经过模型的确定性调用路径：地图/POI 同步接口走这里，
//! 参数由调用方自己校验，与智能体共享同一个 ToolGateway。

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::mcp::{ToolGateway, ToolInvocationResult};
use crate::schema::Location;

/// POI 摘要（直调路径给前端地图用的精简结构）
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoiSummary {
    pub id: String,
    pub name: String,
    pub poi_type: String,
    pub address: String,
    pub location: Location,
}

/// 单次搜索最多收集的 POI 数
const MAX_POIS: usize = 15;

/// 直调方：透传 gateway，不涉及任何概率性解析
pub struct DirectToolInvoker {
    gateway: Arc<ToolGateway>,
}

impl DirectToolInvoker {
    pub fn new(gateway: Arc<ToolGateway>) -> Self {
        Self { gateway }
    }

    /// 直接调用任意已发现工具
    pub async fn invoke(&self, tool_name: &str, arguments: Map<String, Value>) -> ToolInvocationResult {
        self.gateway.invoke(tool_name, arguments).await
    }

    /// POI 搜索：调 maps_text_search 并解析高德返回的三种常见形态
    /// （{"pois": [...]} / {"data": {"pois": [...]}} / 裸数组），
    /// 无坐标的条目跳过，最多取 15 个
    pub async fn search_poi(&self, keywords: &str, city: &str) -> Vec<PoiSummary> {
        let mut args = Map::new();
        args.insert("keywords".to_string(), json!(keywords));
        args.insert("city".to_string(), json!(city));
        args.insert("citylimit".to_string(), json!("true"));

        let result = self.gateway.invoke("maps_text_search", args).await;
        if !result.ok {
            tracing::warn!(
                error = result.error.as_deref().unwrap_or("unknown"),
                "direct POI search failed"
            );
            return Vec::new();
        }
        parse_pois(&result.payload)
    }
}

fn parse_pois(data: &Value) -> Vec<PoiSummary> {
    let items = data
        .get("pois")
        .and_then(|p| p.as_array())
        .or_else(|| {
            data.get("data")
                .and_then(|d| d.get("pois"))
                .and_then(|p| p.as_array())
        })
        .or_else(|| data.as_array());

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let location = obj
                .get("location")
                .and_then(|l| l.as_str())
                .and_then(Location::parse)?;
            Some(PoiSummary {
                id: obj
                    .get("id")
                    .and_then(|i| i.as_str())
                    .unwrap_or_default()
                    .to_string(),
                name: obj.get("name").and_then(|n| n.as_str())?.to_string(),
                poi_type: obj
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string(),
                address: obj
                    .get("address")
                    .and_then(|a| a.as_str())
                    .unwrap_or_default()
                    .to_string(),
                location,
            })
        })
        .take(MAX_POIS)
        .collect()
}
