//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use crate::concurrency::{WorkerConfig, WorkerStrategy};
use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL；未配置时使用进程内存储（仅限本地运行）
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 管理接口主密钥（x-master-key），无默认值
    pub master_key: Secret<String>,
    /// 是否信任 X-Forwarded-For 头
    pub trust_proxy: bool,
    /// IP 白名单（可选，逗号分隔）
    pub allowed_ips: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// OpenAI 兼容接口地址
    pub base_url: String,
    /// 未配置时分类失败，事件降级为 normal
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub api_base: String,
    pub bot_token: Option<Secret<String>>,
    pub alerts_channel_id: Option<String>,
    pub reports_channel_id: Option<String>,
    /// 纯文本长度上限（字符）
    pub message_limit: usize,
    /// 卡片描述长度上限（字符）
    pub embed_limit: usize,
    pub timeout_secs: u64,
}

/// 报告生成策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPolicy {
    /// error/attention 事件入库后自动生成
    #[default]
    Automatic,
    /// 仅由运维命令触发
    OnDemand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub report_policy: ReportPolicy,
    /// 告警消息中日志摘录的最大字符数
    pub alert_excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// 分析进度表容量（LRU）
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub classifier: ClassifierConfig,
    pub generation: GenerationConfig,
    pub notifier: NotifierConfig,
    pub pipeline: PipelineConfig,
    pub workers: WorkerConfig,
    pub status: StatusConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.trust_proxy", true)?
            .set_default("classifier.base_url", "https://api.openai.com/v1")?
            .set_default("classifier.model", "gpt-4o-mini")?
            .set_default("classifier.timeout_secs", 10)?
            .set_default("generation.model", "gpt-4o-mini")?
            .set_default("generation.temperature", 0.7)?
            .set_default("generation.timeout_secs", 60)?
            .set_default("notifier.api_base", "https://discord.com/api/v10")?
            .set_default("notifier.message_limit", 2000)?
            .set_default("notifier.embed_limit", 4000)?
            .set_default("notifier.timeout_secs", 15)?
            .set_default("pipeline.report_policy", "automatic")?
            .set_default("pipeline.alert_excerpt_chars", 1800)?
            .set_default("workers.max_concurrent", 8)?
            .set_default("workers.queue_capacity", 256)?
            .set_default("workers.strategy", "wait")?
            .set_default("status.capacity", 10_000)?;

        // 从环境变量加载配置（前缀为 SENTINEL_）
        settings = settings.add_source(
            Environment::with_prefix("SENTINEL")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("security.allowed_ips")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围（0 表示随机端口）
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // 验证主密钥长度（至少 16 字符）
        if self.security.master_key.expose_secret().len() < 16 {
            return Err(ConfigError::Message(
                "master_key must be at least 16 characters long".to_string(),
            ));
        }

        // 验证外部调用超时
        if self.classifier.timeout_secs == 0
            || self.generation.timeout_secs == 0
            || self.notifier.timeout_secs == 0
        {
            return Err(ConfigError::Message(
                "classifier, generation and notifier timeouts must be > 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Message(
                "generation.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        // 验证消息长度上限（截断需要保留 "..."）
        if self.notifier.message_limit < 4 || self.notifier.embed_limit < 4 {
            return Err(ConfigError::Message(
                "notifier limits must be at least 4 characters".to_string(),
            ));
        }

        if self.pipeline.alert_excerpt_chars == 0 {
            return Err(ConfigError::Message(
                "pipeline.alert_excerpt_chars must be > 0".to_string(),
            ));
        }

        // 验证工作池与进度表容量
        if self.workers.max_concurrent == 0 {
            return Err(ConfigError::Message(
                "workers.max_concurrent must be > 0".to_string(),
            ));
        }
        if self.workers.strategy == WorkerStrategy::Wait && self.workers.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "workers.queue_capacity must be > 0 with the wait strategy".to_string(),
            ));
        }
        if self.status.capacity == 0 {
            return Err(ConfigError::Message("status.capacity must be > 0".to_string()));
        }

        Ok(())
    }
}
