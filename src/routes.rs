//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware::AppState};

/// 请求体上限（结构化日志可能较大）
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 日志接入（系统令牌，在处理器内校验）
    let ingest_routes = Router::new().route("/api/v1/webhook", post(handlers::webhook::ingest_log));

    // 管理接口（主密钥）
    let admin_routes = Router::new()
        // 日志事件
        .route("/api/v1/events", get(handlers::events::list_events))
        .route("/api/v1/events/status", get(handlers::events::analysis_status))
        .route("/api/v1/events/{id}/report", post(handlers::events::trigger_report))
        // 运维命令
        .route("/api/v1/commands", post(handlers::reports::run_command))
        // 系统
        .route(
            "/api/v1/systems",
            get(handlers::systems::list_systems).post(handlers::systems::create_system),
        )
        .route(
            "/api/v1/systems/{id}",
            get(handlers::systems::get_system).put(handlers::systems::update_system),
        )
        // 过滤规则
        .route(
            "/api/v1/systems/{id}/filters",
            get(handlers::systems::list_filters).post(handlers::systems::create_filter),
        )
        .route(
            "/api/v1/systems/{id}/filters/{filter_id}",
            delete(handlers::systems::delete_filter),
        )
        // 清理
        .route("/api/v1/systems/{id}/cleanup", post(handlers::systems::cleanup_events))
        // 报告
        .route("/api/v1/reports", get(handlers::reports::list_reports))
        .route("/api/v1/reports/{id}", get(handlers::reports::get_report))
        // 工作池
        .route("/api/v1/workers", get(handlers::reports::worker_stats))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::master_key_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(ingest_routes)
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::ip_whitelist_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
