//! 被监控系统、过滤规则与清理的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::AppState,
    models::{
        filter::{CleanupRequest, CreateFilterRequest},
        system::{CreateSystemRequest, UpdateSystemRequest},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

// ==================== Systems ====================

/// 列出系统
pub async fn list_systems(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let systems = state.system_service.list().await?;
    Ok(Json(systems))
}

/// 注册系统，返回的 id 即推送日志使用的令牌
pub async fn create_system(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSystemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let system = state.system_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(system)))
}

/// 获取系统详情
pub async fn get_system(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let system = state.system_service.get(&id).await?;
    Ok(Json(system))
}

/// 部分更新系统
pub async fn update_system(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSystemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let system = state.system_service.update(&id, req).await?;
    Ok(Json(system))
}

// ==================== Filters ====================

/// 列出过滤规则
pub async fn list_filters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let filters = state.filter_service.list(&id).await?;
    Ok(Json(filters))
}

/// 新增过滤规则
pub async fn create_filter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateFilterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let filter = state.filter_service.create(&id, req).await?;
    Ok((StatusCode::CREATED, Json(filter)))
}

/// 删除过滤规则
pub async fn delete_filter(
    State(state): State<Arc<AppState>>,
    Path((id, filter_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state.filter_service.delete(&id, filter_id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

// ==================== Cleanup ====================

/// 按模式删除历史事件
pub async fn cleanup_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CleanupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.cleanup_service.cleanup(&id, req).await?;
    Ok(Json(json!({
        "status": "success",
        "system_id": summary.system_id,
        "pattern": summary.pattern,
        "cleaned_count": summary.cleaned_count
    })))
}
