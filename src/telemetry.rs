//! 日志与追踪系统
//! 初始化结构化日志和指标收集

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化日志与追踪系统
pub fn init_telemetry(config: &AppConfig) {
    // 从环境变量构建过滤器
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // 根据配置选择日志格式
    let log_layer = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    // try_init：测试中可能重复初始化
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.logging.level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
}

/// 初始化指标收集器
pub fn init_metrics() {
    // 未安装 recorder 时 metrics 宏为空操作，导出器由部署方选择
    metrics::describe_counter!("ingest_events_total", "Log events received, by outcome");
    metrics::describe_counter!(
        "ingest_classifier_degraded_total",
        "Classifications that failed or timed out and were stored as normal"
    );
    metrics::describe_counter!("reports_generated_total", "Report generation attempts, by result");
    metrics::describe_counter!("notifications_total", "Notifications, by destination and result");
    metrics::describe_counter!("worker_tasks_total", "Background tasks finished, by result");
    metrics::describe_histogram!("http_request_duration_seconds", "HTTP request latency");
    tracing::debug!("Metrics initialized");
}
