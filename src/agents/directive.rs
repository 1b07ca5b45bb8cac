//! 工具调用指令文法
//!
//! 模型输出中请求工具调用的固定文本格式（单行，无嵌套）：
//!
//! ```text
//! TOOL_CALL:tool_name:key1=value1,key2=value2
//! ```
//!
//! 这里按小文法显式检查，而非正则：缺字段、空键等一律归为
//! DirectiveMalformed，由智能体降级处理，绝不 panic。

use serde_json::{Map, Value};

use crate::error::PlanError;
use crate::mcp::ToolInvocationRequest;

/// 指令行标记
pub const DIRECTIVE_MARKER: &str = "TOOL_CALL";

/// 在模型整段输出中找第一条含标记的行；按行扫描，忽略前后空白
pub fn extract_directive(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with(DIRECTIVE_MARKER))
}

/// 解析单条指令行为 ToolInvocationRequest
///
/// 文法：`TOOL_CALL ":" tool_name ":" [pair ("," pair)*]`，pair = `key "=" value`。
/// 值允许任意非逗号字符（含中文）；键为空、tool_name 为空、缺分隔符即 Malformed。
pub fn parse_directive(line: &str) -> Result<ToolInvocationRequest, PlanError> {
    let line = line.trim();

    let rest = line
        .strip_prefix(DIRECTIVE_MARKER)
        .ok_or_else(|| malformed(line, "missing marker"))?;
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| malformed(line, "missing `:` after marker"))?;

    let (tool, args_part) = match rest.split_once(':') {
        Some((tool, args)) => (tool.trim(), args.trim()),
        // 只有工具名、没有参数段也接受（无参工具）
        None => (rest.trim(), ""),
    };

    if tool.is_empty() {
        return Err(malformed(line, "empty tool name"));
    }

    let mut arguments = Map::new();
    if !args_part.is_empty() {
        for pair in args_part.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed(line, "argument pair missing `=`"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed(line, "empty argument key"));
            }
            arguments.insert(key.to_string(), Value::String(value.trim().to_string()));
        }
    }

    Ok(ToolInvocationRequest {
        tool: tool.to_string(),
        arguments,
    })
}

fn malformed(line: &str, detail: &str) -> PlanError {
    PlanError::DirectiveMalformed(format!("{detail}: {line}"))
}
