//! 规划输出解析器
//!
//! 从规划智能体的原始文本中提取并校验 TripPlan JSON，依次尝试：
//! (1) ```json 围栏块 (2) 整段文本 (3) 第一个配平的 {...} 片段。
//! 每个候选都必须既能反序列化又通过 validate_trip_plan；全部失败返回
//! ParseFailed，由编排器转入兜底计划——这是契约内的正常分支，不是异常路径。

use crate::error::PlanError;
use crate::schema::{validate_trip_plan, TripPlan};

/// 解析并校验；对外绝不 panic
pub fn parse(raw: &str) -> Result<TripPlan, PlanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PlanError::ParseFailed("empty planner output".to_string()));
    }

    let mut last_error = String::new();

    // 1) 围栏代码块
    if let Some(block) = extract_fenced_block(trimmed) {
        match try_parse(block) {
            Ok(plan) => return Ok(plan),
            Err(e) => last_error = e,
        }
    }

    // 2) 整段文本
    match try_parse(trimmed) {
        Ok(plan) => return Ok(plan),
        Err(e) => last_error = e,
    }

    // 3) 第一个配平的 {...} 片段
    if let Some(span) = first_balanced_object(trimmed) {
        match try_parse(span) {
            Ok(plan) => return Ok(plan),
            Err(e) => last_error = e,
        }
    }

    Err(PlanError::ParseFailed(last_error))
}

fn try_parse(candidate: &str) -> Result<TripPlan, String> {
    let plan: TripPlan =
        serde_json::from_str(candidate).map_err(|e| format!("json error: {e}"))?;
    validate_trip_plan(&plan).map_err(|e| format!("schema violation: {e}"))?;
    Ok(plan)
}

/// 提取第一个 ```json（或无标签 ```）围栏块的内容
fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // 跳过围栏标签行（json / JSON / 空）
    let body_start = after_fence.find('\n')?;
    let tag = after_fence[..body_start].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after_fence[body_start + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// 扫描第一个配平的 JSON 对象片段；对字符串字面量与转义做了处理，
/// 避免值里出现 { } 时截断出错
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
