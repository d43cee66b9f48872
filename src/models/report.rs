//! Diagnostic report models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 诊断报告：由报告生成器写入，之后不可变更
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub system_id: String,
    pub event_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub system_id: String,
    pub event_id: i64,
    pub content: String,
}
