//! The `/sync` slash command.
//!
//! Authorizes the caller against the configured [`Roster`], acknowledges the
//! interaction, runs the pipeline while posting one follow-up per step, and
//! finishes with a success or failure embed. Only one sync runs at a time;
//! overlapping invocations get an ephemeral "busy" reply.

use anyhow::Result;
use async_trait::async_trait;
use deploy_bot_core::auth::Roster;
use deploy_bot_core::config::SyncConfig;
use deploy_bot_core::contract::{PlacePublisher, ProgressReporter, SourceRepository};
use deploy_bot_core::error::SyncError;
use deploy_bot_core::synchronise::synchronise;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::embed::{failure_embed, success_embed};
use super::interaction::{CommandOptionSpec, CommandSpec, Interaction, InteractionRef, OPTION_STRING};
use super::rest::MessageData;

pub const SYNC_COMMAND: &str = "sync";
pub const PERMISSION_DENIED: &str = "❌ You don't have permission to use this command.";

const CHAT_INPUT: u8 = 1;

/// Ways of answering an interaction.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Immediate reply only the caller sees.
    async fn reply_ephemeral(&self, interaction: &InteractionRef, content: String) -> Result<()>;

    /// Acknowledge now, answer later through follow-ups.
    async fn defer(&self, interaction: &InteractionRef) -> Result<()>;

    async fn followup(&self, interaction: &InteractionRef, message: MessageData) -> Result<()>;
}

#[async_trait]
impl<T: InteractionResponder + ?Sized> InteractionResponder for Arc<T> {
    async fn reply_ephemeral(&self, interaction: &InteractionRef, content: String) -> Result<()> {
        (**self).reply_ephemeral(interaction, content).await
    }

    async fn defer(&self, interaction: &InteractionRef) -> Result<()> {
        (**self).defer(interaction).await
    }

    async fn followup(&self, interaction: &InteractionRef, message: MessageData) -> Result<()> {
        (**self).followup(interaction, message).await
    }
}

/// Something the gateway can route interactions to.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Commands to register once the session is ready.
    fn commands(&self) -> Vec<CommandSpec>;

    async fn handle(&self, interaction: Interaction);
}

pub fn sync_command_spec() -> CommandSpec {
    CommandSpec {
        name: SYNC_COMMAND.to_string(),
        description: "Sync latest changes from GitHub to Roblox".to_string(),
        kind: CHAT_INPUT,
        options: vec![CommandOptionSpec {
            kind: OPTION_STRING,
            name: "branch".to_string(),
            description: "Branch to sync from (defaults to the configured branch)".to_string(),
            required: false,
        }],
    }
}

/// How one invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Denied,
    Busy,
    Completed,
    Failed,
}

pub struct SyncCommand<S, P, D> {
    config: SyncConfig,
    roster: Roster,
    repo: S,
    publisher: P,
    responder: D,
    running: Mutex<()>,
}

impl<S, P, D> SyncCommand<S, P, D>
where
    S: SourceRepository,
    P: PlacePublisher,
    D: InteractionResponder,
{
    pub fn new(config: SyncConfig, roster: Roster, repo: S, publisher: P, responder: D) -> Self {
        Self {
            config,
            roster,
            repo,
            publisher,
            responder,
            running: Mutex::new(()),
        }
    }

    pub async fn execute(&self, interaction: &Interaction) -> Result<Outcome> {
        let target = interaction.reference();

        let permitted = self.roster.is_unrestricted()
            || interaction
                .caller()
                .is_some_and(|caller| self.roster.permits(&caller.user_id, &caller.role_ids));
        if !permitted {
            warn!(caller = ?interaction.caller(), "Permission denied for /sync");
            self.responder
                .reply_ephemeral(&target, PERMISSION_DENIED.to_string())
                .await?;
            return Ok(Outcome::Denied);
        }

        let Ok(_running) = self.running.try_lock() else {
            info!("Rejected /sync while another sync is running");
            self.responder
                .reply_ephemeral(&target, format!("⏳ {}", SyncError::Busy))
                .await?;
            return Ok(Outcome::Busy);
        };

        self.responder.defer(&target).await?;

        let reporter = FollowupReporter {
            responder: &self.responder,
            interaction: &target,
        };
        let branch = interaction.string_option("branch");
        let result = synchronise(&self.config, &self.repo, &self.publisher, &reporter, branch).await;

        let (outcome, embed) = match &result {
            Ok(report) => (Outcome::Completed, success_embed(report)),
            Err(e) => (Outcome::Failed, failure_embed(e)),
        };
        self.responder
            .followup(&target, MessageData::embed(embed))
            .await?;
        Ok(outcome)
    }
}

#[async_trait]
impl<S, P, D> CommandHandler for SyncCommand<S, P, D>
where
    S: SourceRepository,
    P: PlacePublisher,
    D: InteractionResponder,
{
    fn commands(&self) -> Vec<CommandSpec> {
        vec![sync_command_spec()]
    }

    async fn handle(&self, interaction: Interaction) {
        if !interaction.is_command(SYNC_COMMAND) {
            debug!(kind = interaction.kind, "Ignoring unknown interaction");
            return;
        }
        match self.execute(&interaction).await {
            Ok(outcome) => info!(?outcome, "/sync finished"),
            Err(e) => error!(error = %e, "Failed to answer /sync"),
        }
    }
}

/// Posts each progress line as a follow-up message.
struct FollowupReporter<'a, D> {
    responder: &'a D,
    interaction: &'a InteractionRef,
}

#[async_trait]
impl<'a, D: InteractionResponder> ProgressReporter for FollowupReporter<'a, D> {
    async fn progress(&self, message: String) {
        if let Err(e) = self
            .responder
            .followup(self.interaction, MessageData::text(message))
            .await
        {
            warn!(error = %e, "Failed to post progress message");
        }
    }
}
