//! 诊断报告、运维命令与工作池状态的 HTTP 处理器

use crate::{error::AppError, middleware::AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ReportListQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommandRequest {
    #[validate(length(min = 1, max = 2000, message = "content must not be empty"))]
    pub content: String,
}

/// 列出报告（按时间倒序）
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportListQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let reports = state.report_service.list_reports(query.limit).await?;
    Ok(Json(reports))
}

/// 获取报告详情
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.report_service.get_report(id).await?;
    Ok(Json(report))
}

/// 执行运维聊天命令
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let reply = state.command_service.execute(&req.content).await?;
    Ok(Json(reply))
}

/// 工作池统计
pub async fn worker_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.workers.stats())
}
