//! HTTP 中间件与应用状态
//! 请求追踪、IP 白名单

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    concurrency::WorkerPool,
    config::AppConfig,
    error::AppError,
    ports::{Classifier, Notifier, TextGenerator},
    repository::Stores,
    services::{
        AnalysisStatusStore, CleanupService, CommandService, FilterService, IngestionPipeline,
        LruStatusStore, PipelineSettings, PoolScheduler, ReportService, SystemService,
        TaskScheduler,
    },
};

/// 外部能力实现
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn Classifier>,
    pub generator: Arc<dyn TextGenerator>,
    pub notifier: Arc<dyn Notifier>,
}

/// 应用状态
///
/// 服务均以 Arc 共享，Clone 只是指针拷贝。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// 未配置数据库时为 None（进程内存储）
    pub db: Option<PgPool>,
    pub stores: Stores,
    pub status_store: Arc<dyn AnalysisStatusStore>,
    pub workers: WorkerPool,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub pipeline: Arc<IngestionPipeline>,
    pub report_service: Arc<ReportService>,
    pub system_service: Arc<SystemService>,
    pub filter_service: Arc<FilterService>,
    pub cleanup_service: Arc<CleanupService>,
    pub command_service: Arc<CommandService>,
}

impl AppState {
    /// 组装全部服务，后台任务交给工作池执行
    pub fn new(
        config: AppConfig,
        db: Option<PgPool>,
        stores: Stores,
        capabilities: Capabilities,
    ) -> Self {
        Self::assemble(config, db, stores, capabilities, None)
    }

    /// 使用自定义调度器（测试中记录任务而不执行）
    pub fn with_scheduler(
        config: AppConfig,
        db: Option<PgPool>,
        stores: Stores,
        capabilities: Capabilities,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self::assemble(config, db, stores, capabilities, Some(scheduler))
    }

    fn assemble(
        config: AppConfig,
        db: Option<PgPool>,
        stores: Stores,
        capabilities: Capabilities,
        scheduler: Option<Arc<dyn TaskScheduler>>,
    ) -> Self {
        let status_store: Arc<dyn AnalysisStatusStore> =
            Arc::new(LruStatusStore::new(config.status.capacity));
        let workers = WorkerPool::new(config.workers.clone());

        let report_service = Arc::new(ReportService::new(
            stores.clone(),
            capabilities.generator.clone(),
            capabilities.notifier.clone(),
            status_store.clone(),
            Duration::from_secs(config.generation.timeout_secs),
        ));

        let scheduler = scheduler.unwrap_or_else(|| {
            Arc::new(PoolScheduler::new(
                workers.clone(),
                capabilities.notifier.clone(),
                report_service.clone(),
            ))
        });

        let pipeline = Arc::new(IngestionPipeline::new(
            stores.clone(),
            capabilities.classifier.clone(),
            scheduler.clone(),
            PipelineSettings {
                classify_timeout: Duration::from_secs(config.classifier.timeout_secs),
                report_policy: config.pipeline.report_policy,
                alert_excerpt_chars: config.pipeline.alert_excerpt_chars,
            },
        ));

        Self {
            system_service: Arc::new(SystemService::new(stores.clone())),
            filter_service: Arc::new(FilterService::new(stores.clone())),
            cleanup_service: Arc::new(CleanupService::new(stores.clone(), scheduler.clone())),
            command_service: Arc::new(CommandService::new(
                report_service.clone(),
                scheduler.clone(),
                status_store.clone(),
            )),
            config,
            db,
            stores,
            status_store,
            workers,
            scheduler,
            pipeline,
            report_service,
        }
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        metrics::histogram!(
            "http_request_duration_seconds",
            "method" => method.as_str().to_owned(),
            "status" => status.to_string()
        )
        .record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 调用方传入的 trace_id 可能不是合法头值，此时不回写
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// IP 白名单中间件
pub async fn ip_whitelist_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(allowed_ips) = &state.config.security.allowed_ips {
        let client_ip = get_client_ip(&req, state.config.security.trust_proxy);

        if !allowed_ips.iter().any(|ip| ip == &client_ip) {
            tracing::warn!(client_ip = %client_ip, "IP not in whitelist");
            return Err(AppError::Forbidden);
        }

        tracing::debug!(client_ip = %client_ip, "IP allowed by whitelist");
    }

    Ok(next.run(req).await)
}

/// 获取客户端 IP 地址
fn get_client_ip(req: &Request, trust_proxy: bool) -> String {
    let headers = req.headers();

    // 如果信任代理，从 X-Forwarded-For 获取
    if trust_proxy {
        if let Some(first_ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first_ip.to_string();
        }

        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            return real_ip.trim().to_string();
        }
    }

    // 需要 into_make_service_with_connect_info 才有连接信息
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
