//! Monitored system repository

use super::SystemStore;
use crate::{error::AppError, models::system::*};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct SystemRepository {
    db: PgPool,
}

impl SystemRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SystemStore for SystemRepository {
    /// 注册系统
    async fn insert(
        &self,
        id: &str,
        req: &CreateSystemRequest,
    ) -> Result<MonitoredSystem, AppError> {
        let system = sqlx::query_as::<_, MonitoredSystem>(
            r#"
            INSERT INTO monitored_systems (
                id, name, client_name, client_email, client_phone,
                maintenance_email, status, technical_info
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.client_name)
        .bind(&req.client_email)
        .bind(&req.client_phone)
        .bind(&req.maintenance_email)
        .bind(req.status)
        .bind(&req.technical_info)
        .fetch_one(&self.db)
        .await?;

        Ok(system)
    }

    async fn find(&self, id: &str) -> Result<Option<MonitoredSystem>, AppError> {
        let system =
            sqlx::query_as::<_, MonitoredSystem>("SELECT * FROM monitored_systems WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(system)
    }

    async fn list(&self) -> Result<Vec<MonitoredSystem>, AppError> {
        let systems = sqlx::query_as::<_, MonitoredSystem>(
            "SELECT * FROM monitored_systems ORDER BY created_at, name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(systems)
    }

    /// 部分更新，缺省字段保持原值
    async fn update(
        &self,
        id: &str,
        req: &UpdateSystemRequest,
    ) -> Result<Option<MonitoredSystem>, AppError> {
        let system = sqlx::query_as::<_, MonitoredSystem>(
            r#"
            UPDATE monitored_systems
            SET
                name = COALESCE($2, name),
                client_name = COALESCE($3, client_name),
                client_email = COALESCE($4, client_email),
                client_phone = COALESCE($5, client_phone),
                maintenance_email = COALESCE($6, maintenance_email),
                status = COALESCE($7, status),
                technical_info = COALESCE($8, technical_info),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.client_name)
        .bind(&req.client_email)
        .bind(&req.client_phone)
        .bind(&req.maintenance_email)
        .bind(req.status)
        .bind(&req.technical_info)
        .fetch_optional(&self.db)
        .await?;

        Ok(system)
    }
}
