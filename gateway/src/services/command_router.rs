//! Maps inbound chat commands and button callbacks to their handlers.

use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use crate::error::BotError;
use crate::models::{
    message::{BotReply, CANCEL_TRANSFER_ACTION, CONFIRM_TRANSFER_ACTION},
    session::{ApiKey, Session},
    transfer::{RecipientType, TransferProposal},
};
use crate::services::{
    authenticator::Authenticator, replies, session_store::SessionStore,
    transfer_workflow::TransferWorkflow, wallet_api::WalletApiProvider,
};
use crate::types::ChatUserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth(String),
    FetchBalance,
    SendMoney(String),
    Logout,
    Help,
    Unknown(String),
}

impl Command {
    /// `name` may carry the platform's leading slash; `text` is everything
    /// after the command name.
    pub fn parse(name: &str, text: &str) -> Self {
        let name = name.trim();
        let bare = name.strip_prefix('/').unwrap_or(name);
        match bare {
            "auth" => Command::Auth(text.trim().to_string()),
            "fetch-balance" => Command::FetchBalance,
            "send-money" => Command::SendMoney(text.to_string()),
            "logout" => Command::Logout,
            "help" => Command::Help,
            _ => Command::Unknown(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Auth(_) => "auth",
            Command::FetchBalance => "fetch-balance",
            Command::SendMoney(_) => "send-money",
            Command::Logout => "logout",
            Command::Help => "help",
            Command::Unknown(name) => name,
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Command::FetchBalance | Command::SendMoney(_))
    }
}

/// Parses `send-money` arguments: exactly `<amount> <upi|phone> <recipient>`.
pub fn parse_send_money(args: &str) -> Result<TransferProposal, BotError> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    let [amount, recipient_type, recipient] = tokens.as_slice() else {
        return Err(BotError::validation(
            "Invalid format. Usage: `/send-money <amount> <upi|phone> <recipient>`",
        ));
    };

    let recipient_type: RecipientType = recipient_type.parse().map_err(BotError::validation)?;
    let proposal = TransferProposal::new(*amount, recipient_type, *recipient);
    proposal.validate().map_err(|errors| {
        let messages = errors
            .field_errors()
            .into_iter()
            .map(|(field, _)| format!("{} is too long", field))
            .collect();
        BotError::Validation(messages)
    })?;
    Ok(proposal)
}

pub struct CommandRouter {
    sessions: Arc<dyn SessionStore>,
    authenticator: Authenticator,
    workflow: TransferWorkflow,
    wallet_api: Arc<dyn WalletApiProvider>,
    api_timeout: Duration,
}

impl CommandRouter {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        authenticator: Authenticator,
        workflow: TransferWorkflow,
        wallet_api: Arc<dyn WalletApiProvider>,
        api_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            authenticator,
            workflow,
            wallet_api,
            api_timeout,
        }
    }

    pub async fn dispatch(&self, user_id: &ChatUserId, command: Command) -> BotReply {
        tracing::info!(user_id = %user_id, command = command.name(), "Handling chat command");
        let result = match command {
            Command::Auth(credential) => self.handle_auth(user_id, credential).await,
            Command::FetchBalance => self.handle_fetch_balance(user_id).await,
            Command::SendMoney(args) => self.handle_send_money(user_id, &args).await,
            Command::Logout => Ok(self.handle_logout(user_id).await),
            Command::Help => Ok(replies::help()),
            Command::Unknown(name) => Ok(replies::unknown_command(&name)),
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(user_id = %user_id, code = err.code(), error = %err, "Chat command failed");
            replies::error(&err)
        })
    }

    /// Routes an interactive button click.
    pub async fn handle_action(
        &self,
        user_id: &ChatUserId,
        action_id: &str,
        value: Option<&str>,
    ) -> BotReply {
        tracing::info!(user_id = %user_id, action_id, "Handling interactive action");
        match action_id {
            CONFIRM_TRANSFER_ACTION => self.workflow.confirm(user_id, value).await,
            CANCEL_TRANSFER_ACTION => self.workflow.cancel(user_id, value),
            other => {
                tracing::warn!(user_id = %user_id, action_id = other, "Unknown interactive action");
                BotReply::replacement("This button is no longer supported.")
            }
        }
    }

    async fn require_session(&self, user_id: &ChatUserId) -> Result<Session, BotError> {
        self.sessions
            .get(user_id)
            .await
            .ok_or(BotError::SessionExpired)
    }

    async fn handle_auth(&self, user_id: &ChatUserId, credential: String) -> Result<BotReply, BotError> {
        match self
            .authenticator
            .authenticate(user_id, ApiKey::new(credential))
            .await
        {
            Ok(session) => Ok(replies::authenticated(&session)),
            Err(err) => Ok(replies::auth_failed(&err)),
        }
    }

    async fn handle_fetch_balance(&self, user_id: &ChatUserId) -> Result<BotReply, BotError> {
        let session = self.require_session(user_id).await?;
        let client = self
            .wallet_api
            .client(&session.credential, self.api_timeout)?;
        let balance = client.get_balance().await?;
        Ok(replies::balance(&balance))
    }

    async fn handle_send_money(&self, user_id: &ChatUserId, args: &str) -> Result<BotReply, BotError> {
        let proposal = parse_send_money(args)?;
        let session = self.require_session(user_id).await?;
        self.workflow.propose(&session, proposal).await
    }

    async fn handle_logout(&self, user_id: &ChatUserId) -> BotReply {
        let had_session = self.sessions.remove(user_id).await;
        if had_session {
            tracing::info!(user_id = %user_id, "Chat user logged out");
        }
        replies::logged_out(had_session)
    }
}
