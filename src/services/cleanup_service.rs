//! 历史日志清理
//!
//! 同步删除，不调用分类器，也不触发报告；完成后向报告频道发送摘要。

use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::filter::{CleanupRequest, CleanupSummary};
use crate::ports::{colors, Destination, Embed, EmbedField, NotifyMessage};
use crate::repository::Stores;
use crate::services::background::{BackgroundTask, TaskScheduler};

pub struct CleanupService {
    stores: Stores,
    scheduler: Arc<dyn TaskScheduler>,
}

impl CleanupService {
    pub fn new(stores: Stores, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self { stores, scheduler }
    }

    /// 删除消息或容器名包含 pattern 的事件
    #[instrument(skip(self, request))]
    pub async fn cleanup(&self, system_id: &str, request: CleanupRequest) -> Result<CleanupSummary> {
        request.validate()?;
        // 空模式会匹配全部事件
        if request.pattern.is_empty() {
            return Err(AppError::validation("pattern must not be empty"));
        }

        let system = self
            .stores
            .systems
            .find(system_id)
            .await?
            .ok_or_else(|| AppError::not_found("system"))?;

        let cleaned_count = self
            .stores
            .events
            .delete_matching(&system.id, &request.pattern)
            .await?;

        info!(cleaned_count, pattern = %request.pattern, "Events cleaned up");

        let message = summary_message(&system.name, &request.pattern, cleaned_count);
        if let Err(e) = self.scheduler.schedule(BackgroundTask::Notify {
            destination: Destination::Reports,
            message,
        }) {
            warn!(error = %e, "Failed to schedule cleanup summary");
        }

        Ok(CleanupSummary {
            system_id: system.id,
            pattern: request.pattern,
            cleaned_count,
        })
    }
}

/// 清理摘要：纯文本 + 卡片
pub fn summary_message(system_name: &str, pattern: &str, cleaned_count: u64) -> NotifyMessage {
    let title = format!("🧹 CLEANUP REPORT: {}", system_name);
    let text = format!(
        "**{}**\n\nRemoved pattern: `{}`\nTotal events deleted: **{}**",
        title, pattern, cleaned_count
    );

    NotifyMessage::text(text).with_embed(Embed {
        title,
        description: format!("Events matching `{}` were removed.", pattern),
        color: colors::INFO,
        fields: vec![
            EmbedField {
                name: "Pattern".to_string(),
                value: format!("`{}`", pattern),
                inline: true,
            },
            EmbedField {
                name: "Deleted".to_string(),
                value: cleaned_count.to_string(),
                inline: true,
            },
        ],
    })
}
