//! 主密钥认证中间件

use crate::{error::AppError, middleware::AppState};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const MASTER_KEY_HEADER: &str = "x-master-key";
pub const API_KEY_HEADER: &str = "x-api-key";

/// 读取非空请求头
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 从 x-api-key 头提取系统令牌
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, API_KEY_HEADER)
}

/// 从 x-master-key 头提取主密钥
pub fn extract_master_key(headers: &HeaderMap) -> Result<&str, AppError> {
    header_value(headers, MASTER_KEY_HEADER).ok_or(AppError::Unauthorized)
}

/// 常量时间比较
pub fn verify_master_key(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// 主密钥认证中间件 - 管理接口必须认证
pub async fn master_key_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = extract_master_key(req.headers())?;

    if !verify_master_key(provided, state.config.security.master_key.expose_secret()) {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}
