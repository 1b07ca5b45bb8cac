//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SWALLOW__*` 覆盖（双下划线表示嵌套，如 `SWALLOW__LLM__MODEL=gpt-4o-mini`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub amap: AmapSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// [llm] 段：OpenAI 兼容端点与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容 base_url，未设置时用官方端点
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    /// 单次补全请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key_env: default_llm_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// [amap] 段：高德 MCP 工具提供方
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmapSection {
    /// 工具提供方端点（JSON-RPC over HTTP）
    #[serde(default = "default_amap_endpoint")]
    pub endpoint: String,
    /// 读取高德 API Key 的环境变量名
    #[serde(default = "default_amap_api_key_env")]
    pub api_key_env: String,
}

fn default_amap_endpoint() -> String {
    "http://127.0.0.1:3000/mcp".to_string()
}

fn default_amap_api_key_env() -> String {
    "AMAP_MAPS_API_KEY".to_string()
}

impl Default for AmapSection {
    fn default() -> Self {
        Self {
            endpoint: default_amap_endpoint(),
            api_key_env: default_amap_api_key_env(),
        }
    }
}

/// [pipeline] 段：各阶段超时与并发开关
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// 单个智能体阶段超时（秒），含 LLM 补全与工具调用
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    /// 整条管线截止时间（秒），到期后直接走兜底计划
    #[serde(default = "default_total_deadline_secs")]
    pub total_deadline_secs: u64,
    /// 三个专项智能体是否并发执行（默认顺序，与上游实现一致）
    #[serde(default)]
    pub concurrent_agents: bool,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_stage_timeout_secs() -> u64 {
    45
}

fn default_total_deadline_secs() -> u64 {
    180
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            stage_timeout_secs: default_stage_timeout_secs(),
            total_deadline_secs: default_total_deadline_secs(),
            concurrent_agents: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            amap: AmapSection::default(),
            pipeline: PipelineSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SWALLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SWALLOW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SWALLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
