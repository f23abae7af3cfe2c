//! Operator control commands.
//!
//! Messages the operator sends from their own account are checked for one of
//! the `!bot_*` commands. A command acts on the chat the operator typed it
//! into, i.e. the message's recipient. Everything else the operator writes is
//! ordinary conversation and is left alone.

use crate::catalog;
use crate::dispatcher::ReplyDispatcher;
use crate::error::StoreError;
use crate::router::normalize;
use crate::state::{ConversationState, StateStore};
use frontdesk_core::ContactId;
use frontdesk_transport::MessagingClient;
use std::fmt;
use tracing::info;

/// A recognized control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCommand {
    /// `!bot_desativar`: silence the bot for this contact.
    Deactivate,
    /// `!bot_transferir`: same effect as `Deactivate`.
    Transfer,
    /// `!bot_reativar`: hand the contact back to the bot.
    Reactivate,
}

impl OperatorCommand {
    /// Parses a message body. The whole trimmed body must be the command,
    /// in any letter case.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        match normalize(body).as_str() {
            "!bot_desativar" => Some(Self::Deactivate),
            "!bot_transferir" => Some(Self::Transfer),
            "!bot_reativar" => Some(Self::Reactivate),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deactivate => "!bot_desativar",
            Self::Transfer => "!bot_transferir",
            Self::Reactivate => "!bot_reativar",
        }
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operator message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorOutcome {
    /// Not a command.
    Ignored,
    /// The contact is now handled by a human.
    Silenced { previous: ConversationState },
    /// The bot answers the contact again.
    Resumed,
    /// `!bot_reativar` on a contact the bot was not silenced for.
    NotDeactivated { current: ConversationState },
}

/// Applies operator commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorHandler;

impl OperatorHandler {
    /// Handles one operator-sent message addressed to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store fails. Send failures are logged
    /// by the dispatcher and never surface here.
    pub async fn handle<S, C>(
        &self,
        store: &S,
        dispatcher: &ReplyDispatcher<C>,
        target: &ContactId,
        body: &str,
    ) -> frontdesk_core::Result<OperatorOutcome, StoreError>
    where
        S: StateStore + ?Sized,
        C: MessagingClient,
    {
        let Some(command) = OperatorCommand::parse(body) else {
            return Ok(OperatorOutcome::Ignored);
        };

        let before = store.get(target).await?;
        info!(command = %command, target = %target, state = %before, "operator command received");

        let outcome = match command {
            OperatorCommand::Deactivate | OperatorCommand::Transfer => {
                store.set(target, ConversationState::AwaitingHuman).await?;
                dispatcher.deliver(target, &catalog::takeover()).await;
                OperatorOutcome::Silenced { previous: before }
            }
            OperatorCommand::Reactivate if before == ConversationState::AwaitingHuman => {
                store.clear(target).await?;
                dispatcher.deliver(target, &catalog::handback()).await;
                OperatorOutcome::Resumed
            }
            OperatorCommand::Reactivate => {
                dispatcher.deliver(target, &catalog::not_deactivated()).await;
                OperatorOutcome::NotDeactivated { current: before }
            }
        };

        let after = store.get(target).await?;
        info!(
            command = %command,
            target = %target,
            before = %before,
            after = %after,
            "operator command applied"
        );

        Ok(outcome)
    }
}
