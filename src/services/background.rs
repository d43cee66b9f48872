//! 后台任务调度
//!
//! 请求路径只负责提交任务；任务在工作池中执行，失败只记日志。

use crate::{
    concurrency::{WorkerError, WorkerPool},
    ports::{Destination, NotifyMessage, Notifier},
    services::report_service::ReportService,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 请求之外执行的工作
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundTask {
    Notify {
        destination: Destination,
        message: NotifyMessage,
    },
    GenerateReport {
        system_id: String,
        event_id: i64,
    },
}

impl BackgroundTask {
    pub fn name(&self) -> &'static str {
        match self {
            BackgroundTask::Notify { .. } => "notify",
            BackgroundTask::GenerateReport { .. } => "generate_report",
        }
    }
}

/// 任务调度接口，测试中可替换为记录型实现
pub trait TaskScheduler: Send + Sync {
    fn schedule(&self, task: BackgroundTask) -> Result<(), WorkerError>;
}

/// 基于工作池的调度器
pub struct PoolScheduler {
    pool: WorkerPool,
    notifier: Arc<dyn Notifier>,
    reports: Arc<ReportService>,
}

impl PoolScheduler {
    pub fn new(pool: WorkerPool, notifier: Arc<dyn Notifier>, reports: Arc<ReportService>) -> Self {
        Self {
            pool,
            notifier,
            reports,
        }
    }
}

impl TaskScheduler for PoolScheduler {
    fn schedule(&self, task: BackgroundTask) -> Result<(), WorkerError> {
        let name = task.name();
        match task {
            BackgroundTask::Notify {
                destination,
                message,
            } => {
                let notifier = self.notifier.clone();
                self.pool.submit(name, async move {
                    deliver(notifier.as_ref(), destination, message).await;
                })
            }
            BackgroundTask::GenerateReport {
                system_id,
                event_id,
            } => {
                let reports = self.reports.clone();
                self.pool.submit(name, async move {
                    // 失败已在 ReportService 内记录
                    let _ = reports.generate_report(&system_id, event_id).await;
                })
            }
        }
    }
}

/// 发送通知，截断到目的地上限；失败只记录，不向上传播
pub async fn deliver(notifier: &dyn Notifier, destination: Destination, message: NotifyMessage) {
    let message = message.truncated(notifier.message_limit(), notifier.embed_limit());

    match notifier.notify(destination, &message).await {
        Ok(()) => {
            metrics::counter!(
                "notifications_total",
                "destination" => destination.as_str(),
                "result" => "sent"
            )
            .increment(1);
            debug!(destination = destination.as_str(), "Notification delivered");
        }
        Err(e) => {
            metrics::counter!(
                "notifications_total",
                "destination" => destination.as_str(),
                "result" => "failed"
            )
            .increment(1);
            warn!(destination = destination.as_str(), error = %e, "Notification delivery failed");
        }
    }
}
