//! 日志接入流水线
//!
//! 顺序：鉴权 → 过滤 → 分类 → 入库 → 调度告警与报告。
//! 入库成功后才调度后台任务，调度失败不会回滚已入库的事件。

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::auth::SystemTokenGenerator;
use crate::config::ReportPolicy;
use crate::error::Result;
use crate::models::event::{IngestRequest, LogEvent, NewLogEvent, Severity};
use crate::models::system::MonitoredSystem;
use crate::ports::notifier::truncate_text;
use crate::ports::{colors, Classifier, Destination, Embed, EmbedField, NotifyMessage};
use crate::repository::Stores;
use crate::services::background::{BackgroundTask, TaskScheduler};

/// 接入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// 命中过滤规则，未分类也未入库
    Filtered,
    Stored {
        event_id: i64,
        severity: Severity,
        report_scheduled: bool,
    },
    /// 令牌缺失或未知，未做任何处理
    Unauthorized,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub classify_timeout: Duration,
    pub report_policy: ReportPolicy,
    pub alert_excerpt_chars: usize,
}

/// 接入流水线
pub struct IngestionPipeline {
    stores: Stores,
    classifier: Arc<dyn Classifier>,
    scheduler: Arc<dyn TaskScheduler>,
    settings: PipelineSettings,
}

impl IngestionPipeline {
    pub fn new(
        stores: Stores,
        classifier: Arc<dyn Classifier>,
        scheduler: Arc<dyn TaskScheduler>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            stores,
            classifier,
            scheduler,
            settings,
        }
    }

    /// 接入一条日志
    #[instrument(skip(self, token, request))]
    pub async fn ingest(&self, token: Option<&str>, request: IngestRequest) -> Result<IngestOutcome> {
        // 1. 鉴权必须先于任何其他工作
        let Some(system) = self.authenticate(token).await? else {
            metrics::counter!("ingest_events_total", "outcome" => "unauthorized").increment(1);
            warn!("Rejected log with unknown system token");
            return Ok(IngestOutcome::Unauthorized);
        };

        let text = request.message.canonical_text();

        // 2. 过滤规则，命中第一条即返回
        let filters = self.stores.filters.list(&system.id).await?;
        if let Some(rule) = filters.iter().find(|rule| rule.matches(&text)) {
            metrics::counter!("ingest_events_total", "outcome" => "filtered").increment(1);
            debug!(system_id = %system.id, filter_id = rule.id, "Log suppressed by filter");
            return Ok(IngestOutcome::Filtered);
        }

        // 3. 分类，失败或超时降级为 normal
        let severity = self.classify(&text).await;

        // 4. 入库
        let event = self
            .stores
            .events
            .insert(&NewLogEvent {
                system_id: system.id.clone(),
                message: text,
                container: request.container,
                severity,
                created_at: request.created_at.unwrap_or_else(Utc::now),
            })
            .await?;

        metrics::counter!("ingest_events_total", "outcome" => "stored").increment(1);
        info!(
            system_id = %system.id,
            event_id = event.id,
            severity = %severity,
            "Log event stored"
        );

        // 5. 调度告警与报告
        let report_scheduled = if severity.triggers_report() {
            self.dispatch(&system, &event)
        } else {
            false
        };

        Ok(IngestOutcome::Stored {
            event_id: event.id,
            severity,
            report_scheduled,
        })
    }

    /// 按令牌查找系统；令牌缺失或未知时返回 None
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Option<MonitoredSystem>> {
        match token.filter(|t| SystemTokenGenerator::is_well_formed(t)) {
            Some(token) => self.stores.systems.find(token).await,
            None => Ok(None),
        }
    }

    async fn classify(&self, text: &str) -> Severity {
        let timeout = self.settings.classify_timeout;
        match tokio::time::timeout(timeout, self.classifier.classify(text)).await {
            Ok(Ok(label)) => Severity::normalize(&label),
            Ok(Err(e)) => {
                metrics::counter!("ingest_classifier_degraded_total").increment(1);
                warn!(error = %e, "Classification failed, defaulting to normal");
                Severity::Normal
            }
            Err(_) => {
                metrics::counter!("ingest_classifier_degraded_total").increment(1);
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Classification timed out, defaulting to normal"
                );
                Severity::Normal
            }
        }
    }

    /// 先调度告警，再调度报告；返回报告是否已调度
    fn dispatch(&self, system: &MonitoredSystem, event: &LogEvent) -> bool {
        let alert = BackgroundTask::Notify {
            destination: Destination::Alerts,
            message: alert_notification(system, event, self.settings.alert_excerpt_chars),
        };
        if let Err(e) = self.scheduler.schedule(alert) {
            warn!(event_id = event.id, error = %e, "Failed to schedule alert");
        }

        if self.settings.report_policy == ReportPolicy::OnDemand {
            return false;
        }

        let report = BackgroundTask::GenerateReport {
            system_id: system.id.clone(),
            event_id: event.id,
        };
        match self.scheduler.schedule(report) {
            Ok(()) => true,
            Err(e) => {
                warn!(event_id = event.id, error = %e, "Failed to schedule report");
                false
            }
        }
    }
}

/// 告警通知：纯文本 + 按严重级别着色的卡片
pub fn alert_notification(
    system: &MonitoredSystem,
    event: &LogEvent,
    excerpt_chars: usize,
) -> NotifyMessage {
    let color = match event.severity {
        Severity::Error => colors::ERROR,
        _ => colors::ATTENTION,
    };
    let embed = Embed {
        title: format!("{}: {}", event.severity.as_str().to_uppercase(), system.name),
        description: format!("```{}```", truncate_text(&event.message, excerpt_chars)),
        color,
        fields: vec![
            EmbedField {
                name: "Container".to_string(),
                value: event.container.as_deref().unwrap_or("-").to_string(),
                inline: true,
            },
            EmbedField {
                name: "Event".to_string(),
                value: format!("#{}", event.id),
                inline: true,
            },
        ],
    };

    NotifyMessage::text(alert_message(system, event, excerpt_chars)).with_embed(embed)
}

/// 告警消息：error 用红点，attention 用警告符号
pub fn alert_message(system: &MonitoredSystem, event: &LogEvent, excerpt_chars: usize) -> String {
    let icon = match event.severity {
        Severity::Error => "🔴",
        _ => "⚠️",
    };
    format!(
        "{} **{}: {}**\nContainer: `{}`\nEvent: #{}\n```{}```",
        icon,
        event.severity.as_str().to_uppercase(),
        system.name,
        event.container.as_deref().unwrap_or("-"),
        event.id,
        truncate_text(&event.message, excerpt_chars),
    )
}
