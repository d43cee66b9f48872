//! 后台工作池
//! 告警通知与报告生成在请求之外执行，并发与积压均有上限
//!
//! 投递语义为至多一次：任务要么执行一次，要么（队列已满、进程退出）被丢弃，不会重试。

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// 并发策略：当所有执行槽都被占用时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStrategy {
    /// 拒绝策略：没有空闲执行槽时立即返回错误
    Reject,
    /// 等待策略：进入积压队列，直到队列满（默认）
    #[default]
    Wait,
}

/// 工作池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// 同时执行的任务上限
    pub max_concurrent: usize,
    /// 等待执行槽的任务上限（Wait 策略时使用）
    pub queue_capacity: usize,
    /// 超限时的处理策略
    #[serde(default)]
    pub strategy: WorkerStrategy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            queue_capacity: 256,
            strategy: WorkerStrategy::Wait,
        }
    }
}

/// 调度错误
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// 拒绝策略：执行槽已满
    #[error("Task '{task}' rejected: all {limit} worker slots busy")]
    Rejected { task: &'static str, limit: usize },

    /// 等待策略：积压队列已满
    #[error("Task '{task}' dropped: worker queue is full (max: {max_length})")]
    QueueFull { task: &'static str, max_length: usize },
}

/// 工作池统计
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub max_concurrent: usize,
    pub queue_capacity: usize,
    pub strategy: WorkerStrategy,
    pub running: usize,
    pub queued: usize,
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// 有界后台工作池
#[derive(Clone)]
pub struct WorkerPool {
    /// 执行槽
    slots: Arc<Semaphore>,
    /// 在途任务总数（执行中 + 排队中）
    backlog: Arc<Semaphore>,
    counters: Arc<Counters>,
    config: WorkerConfig,
}

impl WorkerPool {
    /// 创建新的工作池
    pub fn new(config: WorkerConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        let backlog = max_concurrent + config.queue_capacity;

        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            backlog: Arc::new(Semaphore::new(backlog)),
            counters: Arc::new(Counters::default()),
            config: WorkerConfig {
                max_concurrent,
                ..config
            },
        }
    }

    /// 提交任务；成功返回仅表示已被接收，不代表已执行
    pub fn submit<F>(&self, task: &'static str, future: F) -> Result<(), WorkerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.config.strategy {
            WorkerStrategy::Reject => {
                let permit = self.slots.clone().try_acquire_owned().map_err(|_| {
                    WorkerError::Rejected {
                        task,
                        limit: self.config.max_concurrent,
                    }
                })?;
                // 拒绝策略下执行槽即在途名额，backlog 只做计数
                let ticket = self.backlog.clone().try_acquire_owned().ok();

                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                let counters = self.counters.clone();
                tokio::spawn(async move {
                    run_guarded(task, future, &counters).await;
                    drop(ticket);
                    drop(permit);
                });
            }
            WorkerStrategy::Wait => {
                let ticket = self.backlog.clone().try_acquire_owned().map_err(|_| {
                    warn!(task, "Worker queue is full, dropping task");
                    WorkerError::QueueFull {
                        task,
                        max_length: self.config.queue_capacity,
                    }
                })?;

                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                let counters = self.counters.clone();
                let slots = self.slots.clone();
                tokio::spawn(async move {
                    // 工作池的 Semaphore 从不关闭
                    let Ok(permit) = slots.acquire_owned().await else {
                        return;
                    };
                    run_guarded(task, future, &counters).await;
                    drop(permit);
                    drop(ticket);
                });
            }
        }

        debug!(task, "Background task accepted");
        Ok(())
    }

    /// 获取当前统计
    pub fn stats(&self) -> WorkerStats {
        let running = self.config.max_concurrent - self.slots.available_permits();
        let in_flight =
            self.config.max_concurrent + self.config.queue_capacity - self.backlog.available_permits();

        WorkerStats {
            max_concurrent: self.config.max_concurrent,
            queue_capacity: self.config.queue_capacity,
            strategy: self.config.strategy,
            running,
            queued: in_flight.saturating_sub(running),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

/// 执行任务并吸收 panic，避免拖垮工作线程
async fn run_guarded<F>(task: &'static str, future: F, counters: &Counters)
where
    F: Future<Output = ()> + Send + 'static,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(()) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("worker_tasks_total", "task" => task, "result" => "completed")
                .increment(1);
        }
        Err(_) => {
            counters.panicked.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("worker_tasks_total", "task" => task, "result" => "panicked")
                .increment(1);
            error!(task, "Background task panicked");
        }
    }
}
