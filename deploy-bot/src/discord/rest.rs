use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::embed::Embed;
use super::handler::InteractionResponder;
use super::interaction::{CommandSpec, InteractionRef};

/// Message flag that hides a reply from everyone but the caller.
pub const EPHEMERAL: u64 = 1 << 6;

const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;

/// Body of a message sent as an interaction response or follow-up.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessageData {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            flags: Some(EPHEMERAL),
            ..Self::text(content)
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

impl InteractionResponse {
    pub fn message(data: MessageData) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(data),
        }
    }

    /// "Bot is thinking"; the real answer comes as follow-ups.
    pub fn deferred() -> Self {
        Self {
            kind: DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
            data: None,
        }
    }
}

/// Thin client for the Discord REST API.
pub struct DiscordHttp {
    token: String,
    api_base: String,
    http: reqwest::Client,
}

impl DiscordHttp {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Websocket URL for a new gateway session.
    pub async fn gateway_url(&self) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/gateway/bot", self.api_base))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("discord gateway/bot request failed")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("discord gateway/bot failed: {body}"));
        }

        let payload: GatewayBotResponse = response
            .json()
            .await
            .context("discord gateway/bot decode failed")?;

        let mut url = payload.url;
        if !url.contains('?') {
            url.push_str("?v=10&encoding=json");
        }
        Ok(url)
    }

    /// Replaces the application's commands, in one guild or globally.
    pub async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<u64>,
        commands: &[CommandSpec],
    ) -> Result<Vec<String>> {
        let url = match guild_id {
            Some(guild) => format!(
                "{}/applications/{application_id}/guilds/{guild}/commands",
                self.api_base
            ),
            None => format!("{}/applications/{application_id}/commands", self.api_base),
        };

        let response = self
            .send("register commands", || {
                self.http
                    .put(&url)
                    .header("Authorization", self.auth_header())
                    .json(commands)
            })
            .await?;

        let registered: Vec<RegisteredCommand> = response
            .json()
            .await
            .context("discord command registration decode failed")?;
        let names: Vec<String> = registered.into_iter().map(|c| c.name).collect();
        info!(?guild_id, commands = ?names, "Slash commands registered");
        Ok(names)
    }

    pub async fn create_response(
        &self,
        interaction: &InteractionRef,
        response: &InteractionResponse,
    ) -> Result<()> {
        let url = format!(
            "{}/interactions/{}/{}/callback",
            self.api_base, interaction.id, interaction.token
        );
        self.send("interaction callback", || self.http.post(&url).json(response))
            .await?;
        Ok(())
    }

    pub async fn create_followup(
        &self,
        interaction: &InteractionRef,
        message: &MessageData,
    ) -> Result<()> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.api_base, interaction.application_id, interaction.token
        );
        self.send("follow-up message", || self.http.post(&url).json(message))
            .await?;
        Ok(())
    }

    /// Sends the request built by `build`, waiting out 429 responses.
    async fn send<F>(&self, what: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        loop {
            let response = build()
                .send()
                .await
                .with_context(|| format!("discord {what} request failed"))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry = response
                    .json::<RateLimitResponse>()
                    .await
                    .ok()
                    .map(|value| value.retry_after)
                    .unwrap_or(1.0);
                warn!(what, retry_after = retry, "discord rate limited");
                tokio::time::sleep(Duration::from_secs_f64(retry.max(0.1))).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("discord {what} failed ({status}): {body}"));
            }

            return Ok(response);
        }
    }
}

#[async_trait]
impl InteractionResponder for DiscordHttp {
    async fn reply_ephemeral(&self, interaction: &InteractionRef, content: String) -> Result<()> {
        self.create_response(
            interaction,
            &InteractionResponse::message(MessageData::ephemeral(content)),
        )
        .await
    }

    async fn defer(&self, interaction: &InteractionRef) -> Result<()> {
        self.create_response(interaction, &InteractionResponse::deferred())
            .await
    }

    async fn followup(&self, interaction: &InteractionRef, message: MessageData) -> Result<()> {
        self.create_followup(interaction, &message).await
    }
}

#[derive(Debug, Deserialize)]
struct GatewayBotResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RegisteredCommand {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    retry_after: f64,
}
