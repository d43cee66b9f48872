//! Database repository layer
//!
//! 服务层只依赖存储 trait；生产环境使用 PostgreSQL 实现，测试与本地运行使用内存实现。

pub mod event_repo;
pub mod filter_repo;
pub mod memory;
pub mod report_repo;
pub mod system_repo;

pub use event_repo::*;
pub use filter_repo::*;
pub use memory::*;
pub use report_repo::*;
pub use system_repo::*;

use crate::{
    error::Result,
    models::{
        event::{EventListFilters, LogEvent, NewLogEvent},
        filter::{FilterRule, MatchKind},
        report::{NewReport, Report},
        system::{CreateSystemRequest, MonitoredSystem, UpdateSystemRequest},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

#[async_trait]
pub trait SystemStore: Send + Sync {
    async fn insert(&self, id: &str, req: &CreateSystemRequest) -> Result<MonitoredSystem>;
    async fn find(&self, id: &str) -> Result<Option<MonitoredSystem>>;
    async fn list(&self) -> Result<Vec<MonitoredSystem>>;
    async fn update(&self, id: &str, req: &UpdateSystemRequest)
        -> Result<Option<MonitoredSystem>>;
}

#[async_trait]
pub trait FilterStore: Send + Sync {
    async fn insert(&self, system_id: &str, pattern: &str, kind: MatchKind) -> Result<FilterRule>;
    async fn list(&self, system_id: &str) -> Result<Vec<FilterRule>>;
    /// 只删除属于该系统的规则，返回是否删除成功
    async fn delete(&self, system_id: &str, filter_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: &NewLogEvent) -> Result<LogEvent>;
    async fn find(&self, id: i64) -> Result<Option<LogEvent>>;
    /// 按创建时间倒序
    async fn list(&self, filters: &EventListFilters, limit: i64) -> Result<Vec<LogEvent>>;
    /// 删除消息或容器名包含 `pattern` 的事件（纯子串），返回删除条数
    async fn delete_matching(&self, system_id: &str, pattern: &str) -> Result<u64>;
    async fn count_for_system(&self, system_id: &str) -> Result<i64>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: &NewReport) -> Result<Report>;
    async fn find(&self, id: i64) -> Result<Option<Report>>;
    async fn find_latest_for_event(&self, event_id: i64) -> Result<Option<Report>>;
    async fn list(&self, limit: i64) -> Result<Vec<Report>>;
}

/// 所有存储的集合，在服务之间共享
#[derive(Clone)]
pub struct Stores {
    pub systems: Arc<dyn SystemStore>,
    pub filters: Arc<dyn FilterStore>,
    pub events: Arc<dyn EventStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl Stores {
    pub fn postgres(db: PgPool) -> Self {
        Self {
            systems: Arc::new(SystemRepository::new(db.clone())),
            filters: Arc::new(FilterRepository::new(db.clone())),
            events: Arc::new(EventRepository::new(db.clone())),
            reports: Arc::new(ReportRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            systems: store.clone(),
            filters: store.clone(),
            events: store.clone(),
            reports: store,
        }
    }
}
