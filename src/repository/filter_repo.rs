//! Filter rule repository

use super::FilterStore;
use crate::{error::AppError, models::filter::*};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct FilterRepository {
    db: PgPool,
}

impl FilterRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FilterStore for FilterRepository {
    async fn insert(
        &self,
        system_id: &str,
        pattern: &str,
        kind: MatchKind,
    ) -> Result<FilterRule, AppError> {
        let rule = sqlx::query_as::<_, FilterRule>(
            r#"
            INSERT INTO log_filters (system_id, pattern, match_kind)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(system_id)
        .bind(pattern)
        .bind(kind)
        .fetch_one(&self.db)
        .await?;

        Ok(rule)
    }

    async fn list(&self, system_id: &str) -> Result<Vec<FilterRule>, AppError> {
        let rules = sqlx::query_as::<_, FilterRule>(
            "SELECT * FROM log_filters WHERE system_id = $1 ORDER BY id",
        )
        .bind(system_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rules)
    }

    async fn delete(&self, system_id: &str, filter_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM log_filters WHERE id = $1 AND system_id = $2")
            .bind(filter_id)
            .bind(system_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
