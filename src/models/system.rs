//! Monitored system domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 系统生命周期状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "system_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// 开发中
    #[default]
    Development,
    /// 已上线
    Production,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Development => "development",
            SystemStatus::Production => "production",
        }
    }
}

/// 被监控系统
///
/// `id` 同时是系统推送日志时使用的 bearer 令牌。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonitoredSystem {
    pub id: String,
    pub name: String,
    pub client_name: Option<String>,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub maintenance_email: String,
    pub status: SystemStatus,
    /// 技术档案（部署环境、版本、依赖等自由文本）
    pub technical_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register system request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSystemRequest {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub name: String,
    pub client_name: Option<String>,
    #[validate(email(message = "client_email must be a valid email"))]
    pub client_email: String,
    pub client_phone: Option<String>,
    #[validate(email(message = "maintenance_email must be a valid email"))]
    pub maintenance_email: String,
    #[serde(default)]
    pub status: SystemStatus,
    pub technical_info: Option<String>,
}

/// Partial update request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSystemRequest {
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub name: Option<String>,
    pub client_name: Option<String>,
    #[validate(email(message = "client_email must be a valid email"))]
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    #[validate(email(message = "maintenance_email must be a valid email"))]
    pub maintenance_email: Option<String>,
    pub status: Option<SystemStatus>,
    pub technical_info: Option<String>,
}

impl UpdateSystemRequest {
    /// 将变更应用到已有记录上（内存存储使用）
    pub fn apply_to(&self, system: &mut MonitoredSystem) {
        if let Some(name) = &self.name {
            system.name = name.clone();
        }
        if let Some(client_name) = &self.client_name {
            system.client_name = Some(client_name.clone());
        }
        if let Some(client_email) = &self.client_email {
            system.client_email = client_email.clone();
        }
        if let Some(client_phone) = &self.client_phone {
            system.client_phone = Some(client_phone.clone());
        }
        if let Some(maintenance_email) = &self.maintenance_email {
            system.maintenance_email = maintenance_email.clone();
        }
        if let Some(status) = self.status {
            system.status = status;
        }
        if let Some(technical_info) = &self.technical_info {
            system.technical_info = Some(technical_info.clone());
        }
        system.updated_at = Utc::now();
    }
}
