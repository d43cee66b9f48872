//! 日志接入处理器

use crate::{
    auth::extract_api_key,
    error::AppError,
    middleware::AppState,
    models::event::IngestRequest,
    services::IngestOutcome,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 接收被监控系统推送的日志
///
/// 凭据校验先于请求体校验：未知令牌总是得到 401。
pub async fn ingest_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let token = extract_api_key(&headers);

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            if state.pipeline.authenticate(token).await?.is_none() {
                return Err(AppError::Unauthorized);
            }
            return Err(AppError::BadRequest(rejection.body_text()));
        }
    };

    match state.pipeline.ingest(token, request).await? {
        IngestOutcome::Unauthorized => Err(AppError::Unauthorized),
        outcome => Ok(Json(outcome)),
    }
}
