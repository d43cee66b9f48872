//! 运维聊天命令
//!
//! 支持的写法：`report 42`、`!report 42 force`、`/report 42`、`<@bot> 42`、`#42`、`status`、`help`。

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::models::analysis::AnalysisStatus;
use crate::ports::notifier::truncate_text;
use crate::services::background::{BackgroundTask, TaskScheduler};
use crate::services::report_service::{ReportPlan, ReportService};
use crate::services::status_tracker::AnalysisStatusStore;

/// 回复中报告正文的最大字符数
const REPLY_PREVIEW_CHARS: usize = 1500;

const HELP_TEXT: &str = "Commands:
- `report <event_id> [force]` generate (or fetch) the diagnostic report for an event
- `<event_id>` shorthand for `report <event_id>`
- `status` show report generation progress
- `help` show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Report { event_id: i64, force: bool },
    Status,
    Help,
    Unknown(String),
}

impl OperatorCommand {
    pub fn parse(input: &str) -> OperatorCommand {
        let text = strip_mention(input.trim());
        let text = text
            .strip_prefix('!')
            .or_else(|| text.strip_prefix('/'))
            .unwrap_or(text)
            .trim();

        let mut words = text.split_whitespace();
        let Some(head) = words.next() else {
            return OperatorCommand::Help;
        };

        match head.to_lowercase().as_str() {
            "report" | "relatorio" | "relatório" => {
                let Some(event_id) = words.next().and_then(parse_event_id) else {
                    return OperatorCommand::Unknown(text.to_string());
                };
                let force = words.next().is_some_and(|w| w.eq_ignore_ascii_case("force"));
                OperatorCommand::Report { event_id, force }
            }
            "status" => OperatorCommand::Status,
            "help" => OperatorCommand::Help,
            other => match parse_event_id(other) {
                Some(event_id) => OperatorCommand::Report {
                    event_id,
                    force: words.next().is_some_and(|w| w.eq_ignore_ascii_case("force")),
                },
                None => OperatorCommand::Unknown(text.to_string()),
            },
        }
    }
}

/// 去掉开头的 `<@123>` / `<@!123>` 提及
fn strip_mention(text: &str) -> &str {
    if let Some(rest) = text.strip_prefix("<@") {
        if let Some(end) = rest.find('>') {
            return rest[end + 1..].trim_start();
        }
    }
    text
}

fn parse_event_id(word: &str) -> Option<i64> {
    word.trim_start_matches('#')
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
}

/// 命令回复
#[derive(Debug, Clone, Serialize)]
pub struct CommandReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
}

impl CommandReply {
    fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            event_id: None,
        }
    }
}

pub struct CommandService {
    reports: Arc<ReportService>,
    scheduler: Arc<dyn TaskScheduler>,
    status: Arc<dyn AnalysisStatusStore>,
}

impl CommandService {
    pub fn new(
        reports: Arc<ReportService>,
        scheduler: Arc<dyn TaskScheduler>,
        status: Arc<dyn AnalysisStatusStore>,
    ) -> Self {
        Self {
            reports,
            scheduler,
            status,
        }
    }

    /// 执行一条命令；工作池饱和时返回 Unavailable
    #[instrument(skip(self))]
    pub async fn execute(&self, input: &str) -> Result<CommandReply> {
        match OperatorCommand::parse(input) {
            OperatorCommand::Report { event_id, force } => self.report(event_id, force).await,
            OperatorCommand::Status => Ok(self.status_reply()),
            OperatorCommand::Help => Ok(CommandReply::text(HELP_TEXT)),
            OperatorCommand::Unknown(text) => Ok(CommandReply::text(format!(
                "Unknown command `{}`.\n\n{}",
                text, HELP_TEXT
            ))),
        }
    }

    async fn report(&self, event_id: i64, force: bool) -> Result<CommandReply> {
        let plan = match self.reports.plan_for_event(event_id, force).await {
            Ok(plan) => plan,
            Err(AppError::NotFound(_)) => {
                return Ok(CommandReply {
                    reply: format!("Event #{} not found.", event_id),
                    event_id: Some(event_id),
                })
            }
            Err(e) => return Err(e),
        };

        let reply = match plan {
            ReportPlan::Existing(report) => format!(
                "Report #{} for event #{} already exists (use `report {} force` to regenerate):\n\n{}",
                report.id,
                event_id,
                event_id,
                truncate_text(&report.content, REPLY_PREVIEW_CHARS)
            ),
            ReportPlan::Generate {
                system_id,
                event_id,
            } => {
                self.scheduler.schedule(BackgroundTask::GenerateReport {
                    system_id,
                    event_id,
                })?;
                info!(event_id, force, "Report generation scheduled by operator");
                format!(
                    "Report generation started for event #{}. It will be posted to the reports channel.",
                    event_id
                )
            }
        };

        Ok(CommandReply {
            reply,
            event_id: Some(event_id),
        })
    }

    fn status_reply(&self) -> CommandReply {
        let snapshot = self.status.snapshot();
        let analyzing: Vec<String> = snapshot
            .iter()
            .filter(|(_, status)| **status == AnalysisStatus::Analyzing)
            .map(|(id, _)| format!("#{}", id))
            .collect();
        let completed = snapshot.len() - analyzing.len();

        let reply = if analyzing.is_empty() {
            format!("No reports in progress. {} completed.", completed)
        } else {
            format!(
                "Analyzing: {}. {} completed.",
                analyzing.join(", "),
                completed
            )
        };
        CommandReply::text(reply)
    }
}
