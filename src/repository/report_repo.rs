//! Diagnostic report repository

use super::ReportStore;
use crate::{error::AppError, models::report::*};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct ReportRepository {
    db: PgPool,
}

impl ReportRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn insert(&self, report: &NewReport) -> Result<Report, AppError> {
        let stored = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (system_id, event_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&report.system_id)
        .bind(report.event_id)
        .bind(&report.content)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn find(&self, id: i64) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(report)
    }

    async fn find_latest_for_event(&self, event_id: i64) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE event_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(event_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(report)
    }

    async fn list(&self, limit: i64) -> Result<Vec<Report>, AppError> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(reports)
    }
}
