//! 日志事件与报告触发的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::AppState,
    models::event::{EventListFilters, LogEventResponse, Severity},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct EventListQuery {
    pub system_id: Option<String>,
    pub severity: Option<Severity>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    #[serde(default)]
    pub force: bool,
}

/// 列出日志事件（按时间倒序）
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;

    let filters = EventListFilters {
        system_id: query.system_id,
        severity: query.severity,
    };
    let events = state.stores.events.list(&filters, query.limit).await?;

    let events: Vec<LogEventResponse> = events.into_iter().map(Into::into).collect();
    Ok(Json(events))
}

/// 报告生成进度快照
pub async fn analysis_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status_store.snapshot())
}

/// 同步触发报告生成；已有报告时直接返回，`?force=true` 强制重新生成
pub async fn trigger_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<TriggerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.report_service.trigger_for_event(id, query.force).await?;
    Ok(Json(report))
}
