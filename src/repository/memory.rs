//! In-memory store
//!
//! 实现全部存储 trait，语义与 PostgreSQL 实现保持一致，用于测试与无数据库的本地运行。

use super::{EventStore, FilterStore, ReportStore, SystemStore};
use crate::{
    error::{AppError, Result},
    models::{
        event::{EventListFilters, LogEvent, NewLogEvent},
        filter::{FilterRule, MatchKind},
        report::{NewReport, Report},
        system::{CreateSystemRequest, MonitoredSystem, UpdateSystemRequest},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    systems: BTreeMap<String, MonitoredSystem>,
    filters: BTreeMap<i64, FilterRule>,
    events: BTreeMap<i64, LogEvent>,
    reports: BTreeMap<i64, Report>,
    next_filter_id: i64,
    next_event_id: i64,
    next_report_id: i64,
}

/// 进程内存储，重启即丢失
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[async_trait]
impl SystemStore for MemoryStore {
    async fn insert(&self, id: &str, req: &CreateSystemRequest) -> Result<MonitoredSystem> {
        let mut tables = self.tables.lock().await;
        if tables.systems.contains_key(id) {
            return Err(AppError::internal_error("duplicate system id"));
        }

        let now = Utc::now();
        let system = MonitoredSystem {
            id: id.to_string(),
            name: req.name.clone(),
            client_name: req.client_name.clone(),
            client_email: req.client_email.clone(),
            client_phone: req.client_phone.clone(),
            maintenance_email: req.maintenance_email.clone(),
            status: req.status,
            technical_info: req.technical_info.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.systems.insert(system.id.clone(), system.clone());
        Ok(system)
    }

    async fn find(&self, id: &str) -> Result<Option<MonitoredSystem>> {
        Ok(self.tables.lock().await.systems.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<MonitoredSystem>> {
        let mut systems: Vec<_> = self.tables.lock().await.systems.values().cloned().collect();
        systems.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(systems)
    }

    async fn update(
        &self,
        id: &str,
        req: &UpdateSystemRequest,
    ) -> Result<Option<MonitoredSystem>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.systems.get_mut(id).map(|system| {
            req.apply_to(system);
            system.clone()
        }))
    }
}

#[async_trait]
impl FilterStore for MemoryStore {
    async fn insert(&self, system_id: &str, pattern: &str, kind: MatchKind) -> Result<FilterRule> {
        let mut tables = self.tables.lock().await;
        let rule = FilterRule {
            id: next_id(&mut tables.next_filter_id),
            system_id: system_id.to_string(),
            pattern: pattern.to_string(),
            match_kind: kind,
            created_at: Utc::now(),
        };
        tables.filters.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn list(&self, system_id: &str) -> Result<Vec<FilterRule>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .filters
            .values()
            .filter(|rule| rule.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, system_id: &str, filter_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .filters
            .get(&filter_id)
            .is_some_and(|rule| rule.system_id == system_id);
        if owned {
            tables.filters.remove(&filter_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: &NewLogEvent) -> Result<LogEvent> {
        let mut tables = self.tables.lock().await;
        let stored = LogEvent {
            id: next_id(&mut tables.next_event_id),
            system_id: event.system_id.clone(),
            message: event.message.clone(),
            container: event.container.clone(),
            severity: event.severity,
            created_at: event.created_at,
        };
        tables.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: i64) -> Result<Option<LogEvent>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn list(&self, filters: &EventListFilters, limit: i64) -> Result<Vec<LogEvent>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<_> = tables
            .events
            .values()
            .filter(|e| filters.system_id.as_ref().map_or(true, |id| &e.system_id == id))
            .filter(|e| filters.severity.map_or(true, |s| e.severity == s))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn delete_matching(&self, system_id: &str, pattern: &str) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.events.len();
        tables.events.retain(|_, e| {
            let hit = e.message.contains(pattern)
                || e.container.as_deref().is_some_and(|c| c.contains(pattern));
            !(e.system_id == system_id && hit)
        });
        Ok((before - tables.events.len()) as u64)
    }

    async fn count_for_system(&self, system_id: &str) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .values()
            .filter(|e| e.system_id == system_id)
            .count() as i64)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert(&self, report: &NewReport) -> Result<Report> {
        let mut tables = self.tables.lock().await;
        let stored = Report {
            id: next_id(&mut tables.next_report_id),
            system_id: report.system_id.clone(),
            event_id: report.event_id,
            content: report.content.clone(),
            created_at: Utc::now(),
        };
        tables.reports.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: i64) -> Result<Option<Report>> {
        Ok(self.tables.lock().await.reports.get(&id).cloned())
    }

    async fn find_latest_for_event(&self, event_id: i64) -> Result<Option<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .values()
            .filter(|r| r.event_id == event_id)
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .values()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
