//! Discord bot notifier
//!
//! 通过 Bot REST API 向频道发送消息，告警与报告分别对应两个频道。

use crate::{
    config::NotifierConfig,
    ports::{Destination, Embed, NotifyError, NotifyMessage, Notifier},
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Serialize)]
struct DiscordPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<DiscordEmbed<'a>>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    embed: &'a Embed,
}

pub struct DiscordNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<Secret<String>>,
    alerts_channel_id: Option<String>,
    reports_channel_id: Option<String>,
    message_limit: usize,
    embed_limit: usize,
}

impl DiscordNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        let bot_token = config
            .bot_token
            .clone()
            .filter(|token| !token.expose_secret().trim().is_empty());
        if bot_token.is_none() {
            warn!("Discord bot token not configured, notifications disabled");
        }

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            alerts_channel_id: config.alerts_channel_id.clone(),
            reports_channel_id: config.reports_channel_id.clone(),
            message_limit: config.message_limit,
            embed_limit: config.embed_limit,
        }
    }

    fn channel_for(&self, destination: Destination) -> Option<&str> {
        match destination {
            Destination::Alerts => self.alerts_channel_id.as_deref(),
            Destination::Reports => self.reports_channel_id.as_deref(),
        }
        .filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn message_limit(&self) -> usize {
        self.message_limit
    }

    fn embed_limit(&self) -> usize {
        self.embed_limit
    }

    #[instrument(skip(self, message), fields(destination = destination.as_str()))]
    async fn notify(
        &self,
        destination: Destination,
        message: &NotifyMessage,
    ) -> Result<(), NotifyError> {
        let token = self
            .bot_token
            .as_ref()
            .ok_or(NotifyError::NotConfigured("bot_token"))?;
        let channel_id = self
            .channel_for(destination)
            .ok_or(NotifyError::NotConfigured(destination.as_str()))?;

        let message = message
            .clone()
            .truncated(self.message_limit, self.embed_limit);
        let payload = DiscordPayload {
            content: message.content.as_deref(),
            embeds: message
                .embed
                .iter()
                .map(|embed| DiscordEmbed { kind: "rich", embed })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/channels/{}/messages", self.api_base, channel_id))
            .header("Authorization", format!("Bot {}", token.expose_secret()))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send Discord message");
                NotifyError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Discord API returned error");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(channel_id, "Discord message sent");
        Ok(())
    }
}
