//! 诊断报告服务
//!
//! 为 error/attention 事件组装提示词、调用生成能力、保存报告并推送到报告频道。
//! 生成失败不重试，也不会留下报告记录。

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, Result};
use crate::models::event::LogEvent;
use crate::models::report::{NewReport, Report};
use crate::models::system::MonitoredSystem;
use crate::ports::{Destination, GenerationError, NotifyMessage, Notifier, Prompt, TextGenerator};
use crate::repository::Stores;
use crate::services::background::deliver;
use crate::services::status_tracker::{AnalysisGuard, AnalysisStatusStore};

const GENERATOR_SYSTEM_PROMPT: &str = "You are a tech specialist assistant.";
const MISSING_TECHNICAL_INFO: &str = "No technical profile available.";

/// 运维触发时的处理计划
#[derive(Debug, Clone)]
pub enum ReportPlan {
    /// 已有报告，直接返回
    Existing(Report),
    /// 需要（重新）生成
    Generate { system_id: String, event_id: i64 },
}

/// 报告服务
pub struct ReportService {
    stores: Stores,
    generator: Arc<dyn TextGenerator>,
    notifier: Arc<dyn Notifier>,
    status: Arc<dyn AnalysisStatusStore>,
    timeout: Duration,
}

impl ReportService {
    /// 创建新的报告服务
    pub fn new(
        stores: Stores,
        generator: Arc<dyn TextGenerator>,
        notifier: Arc<dyn Notifier>,
        status: Arc<dyn AnalysisStatusStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            stores,
            generator,
            notifier,
            status,
            timeout,
        }
    }

    /// 生成报告
    ///
    /// 进度在进入时标记为 analyzing，任何退出路径都会标记为 completed。
    #[instrument(skip(self))]
    pub async fn generate_report(&self, system_id: &str, event_id: i64) -> Result<Report> {
        let _guard = AnalysisGuard::begin(self.status.clone(), event_id);

        let result = self.generate_inner(system_id, event_id).await;
        let label = match &result {
            Ok(_) => "generated",
            Err(AppError::NotFound(_)) => "not_found",
            Err(_) => "failed",
        };
        metrics::counter!("reports_generated_total", "result" => label).increment(1);

        result
    }

    async fn generate_inner(&self, system_id: &str, event_id: i64) -> Result<Report> {
        let system = self
            .stores
            .systems
            .find(system_id)
            .await?
            .ok_or_else(|| AppError::not_found("system"))?;
        let event = self
            .stores
            .events
            .find(event_id)
            .await?
            .filter(|event| event.system_id == system.id)
            .ok_or_else(|| AppError::not_found("event"))?;

        let prompt = build_prompt(&system, &event);

        let content = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
        {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                error!(error = %e, "Report generation failed");
                return Err(AppError::Upstream(e.to_string()));
            }
            Err(_) => {
                let e = GenerationError::Timeout(self.timeout.as_secs());
                error!(error = %e, "Report generation timed out");
                return Err(AppError::Upstream(e.to_string()));
            }
        };

        let report = self
            .stores
            .reports
            .insert(&NewReport {
                system_id: system.id.clone(),
                event_id: event.id,
                content,
            })
            .await?;

        info!(report_id = report.id, "Report stored");

        deliver(
            self.notifier.as_ref(),
            Destination::Reports,
            NotifyMessage::text(report_message(&system.name, &report.content)),
        )
        .await;

        Ok(report)
    }

    /// 解析运维触发：事件不存在返回 NotFound；已有报告且未强制时复用
    #[instrument(skip(self))]
    pub async fn plan_for_event(&self, event_id: i64, force: bool) -> Result<ReportPlan> {
        let event = self
            .stores
            .events
            .find(event_id)
            .await?
            .ok_or_else(|| AppError::not_found("event"))?;

        if !force {
            if let Some(report) = self.stores.reports.find_latest_for_event(event_id).await? {
                info!(report_id = report.id, "Reusing existing report");
                return Ok(ReportPlan::Existing(report));
            }
        }

        Ok(ReportPlan::Generate {
            system_id: event.system_id,
            event_id,
        })
    }

    /// 同步触发：等待生成完成后返回报告
    pub async fn trigger_for_event(&self, event_id: i64, force: bool) -> Result<Report> {
        match self.plan_for_event(event_id, force).await? {
            ReportPlan::Existing(report) => Ok(report),
            ReportPlan::Generate {
                system_id,
                event_id,
            } => {
                warn!(event_id, "Generating report on operator request");
                self.generate_report(&system_id, event_id).await
            }
        }
    }

    pub async fn get_report(&self, id: i64) -> Result<Report> {
        self.stores
            .reports
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("report"))
    }

    pub async fn list_reports(&self, limit: i64) -> Result<Vec<Report>> {
        self.stores.reports.list(limit).await
    }
}

/// 组装诊断提示词
pub fn build_prompt(system: &MonitoredSystem, event: &LogEvent) -> Prompt {
    let technical_info = system
        .technical_info
        .as_deref()
        .filter(|info| !info.trim().is_empty())
        .unwrap_or(MISSING_TECHNICAL_INFO);

    let user = format!(
        "You are a technical support AI.
A system error or warning has occurred.

SYSTEM TECHNICAL DETAILS:
{technical_info}

CLIENT INFO:
- Name: {client_name}
- Email: {client_email}
- Phone: {client_phone}
- Status: {status}

SYSTEM: {system_name}
CONTAINER: {container}
SEVERITY: {severity}

LOG CONTENT:
{content}

Generate a concise technical report explaining the possible cause and suggested solution.
Keep it professional and technical.",
        client_name = system.client_name.as_deref().unwrap_or("-"),
        client_email = system.client_email,
        client_phone = system.client_phone.as_deref().unwrap_or("-"),
        status = system.status.as_str(),
        system_name = system.name,
        container = event.container.as_deref().unwrap_or("-"),
        severity = event.severity,
        content = event.message,
    );

    Prompt {
        system: GENERATOR_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// 报告频道消息正文（截断由投递时处理）
pub fn report_message(system_name: &str, content: &str) -> String {
    format!("📋 **TECHNICAL REPORT: {}**\n\n{}", system_name, content)
}
