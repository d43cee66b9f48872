//! Log event repository

use super::EventStore;
use crate::{error::AppError, models::event::*};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub struct EventRepository {
    db: PgPool,
}

impl EventRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn insert(&self, event: &NewLogEvent) -> Result<LogEvent, AppError> {
        let stored = sqlx::query_as::<_, LogEvent>(
            r#"
            INSERT INTO log_events (system_id, message, container, severity, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&event.system_id)
        .bind(&event.message)
        .bind(&event.container)
        .bind(event.severity)
        .bind(event.created_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn find(&self, id: i64) -> Result<Option<LogEvent>, AppError> {
        let event = sqlx::query_as::<_, LogEvent>("SELECT * FROM log_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(event)
    }

    async fn list(
        &self,
        filters: &EventListFilters,
        limit: i64,
    ) -> Result<Vec<LogEvent>, AppError> {
        let mut query = String::from("SELECT * FROM log_events WHERE 1=1");
        let mut index = 0;

        if filters.system_id.is_some() {
            index += 1;
            query.push_str(&format!(" AND system_id = ${}", index));
        }
        if filters.severity.is_some() {
            index += 1;
            query.push_str(&format!(" AND severity = ${}", index));
        }
        query.push_str(&format!(" ORDER BY created_at DESC, id DESC LIMIT ${}", index + 1));

        let mut q = sqlx::query_as::<_, LogEvent>(&query);
        if let Some(system_id) = &filters.system_id {
            q = q.bind(system_id);
        }
        if let Some(severity) = filters.severity {
            q = q.bind(severity);
        }

        let events = q.bind(limit).fetch_all(&self.db).await?;
        Ok(events)
    }

    async fn delete_matching(&self, system_id: &str, pattern: &str) -> Result<u64, AppError> {
        // strpos 做纯子串匹配，避免 LIKE 通配符被解释
        let result = sqlx::query(
            r#"
            DELETE FROM log_events
            WHERE system_id = $1
              AND (strpos(message, $2) > 0 OR strpos(COALESCE(container, ''), $2) > 0)
            "#,
        )
        .bind(system_id)
        .bind(pattern)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_for_system(&self, system_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM log_events WHERE system_id = $1")
            .bind(system_id)
            .fetch_one(&self.db)
            .await?;

        Ok(row.try_get("total")?)
    }
}
