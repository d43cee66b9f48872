//! Operator notification port

use async_trait::async_trait;
use serde::Serialize;

/// 通知目的地：告警频道与报告频道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Alerts,
    Reports,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Alerts => "alerts",
            Destination::Reports => "reports",
        }
    }
}

/// 卡片颜色（十进制 RGB）
pub mod colors {
    /// error - red
    pub const ERROR: u32 = 15158332; // #E74C3C
    /// attention - orange
    pub const ATTENTION: u32 = 15105570; // #E67E22
    /// reports / summaries - blue
    pub const INFO: u32 = 3447003; // #3498DB
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// 富文本卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    /// 十进制 RGB
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

/// 一条通知，至少包含纯文本或卡片之一
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifyMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl NotifyMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// 按目的地的长度上限截断正文与卡片描述
    pub fn truncated(mut self, message_limit: usize, embed_limit: usize) -> Self {
        if let Some(content) = self.content.take() {
            self.content = Some(truncate_text(&content, message_limit));
        }
        if let Some(embed) = self.embed.as_mut() {
            embed.description = truncate_text(&embed.description, embed_limit);
        }
        self
    }
}

/// 超长文本截断为 `limit - 3` 个字符并追加 "..."，按字符而非字节计数
///
/// 上限不足以容纳省略号时直接截取前 `limit` 个字符。
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit < 3 {
        return text.chars().take(limit).collect();
    }
    let keep = limit - 3;
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier destination '{0}' is not configured")]
    NotConfigured(&'static str),

    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// 纯文本长度上限（字符）
    fn message_limit(&self) -> usize;

    /// 卡片描述长度上限（字符）
    fn embed_limit(&self) -> usize;

    async fn notify(&self, destination: Destination, message: &NotifyMessage)
        -> Result<(), NotifyError>;
}
