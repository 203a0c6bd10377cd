//! Two-phase transfer protocol: validate and prompt, then confirm or cancel.
//!
//! A validated proposal is not stored server-side. It is encoded into the
//! confirm button and rebuilt from that value when the user clicks. The
//! only server-side trace is the idempotency key in [`PendingTransfers`],
//! which lets exactly one click execute the transfer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BotError;
use crate::models::{
    message::BotReply,
    session::Session,
    transfer::{ConfirmPayload, TransferProposal},
};
use crate::services::{
    pending_transfers::{ClaimOutcome, PendingTransfers},
    replies,
    session_store::SessionStore,
    wallet_api::WalletApiProvider,
};
use crate::types::ChatUserId;
use crate::utils::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Parsed,
    Validated,
    AwaitingConfirmation,
    Confirmed,
    Executed,
    Cancelled,
    /// Backend validation said no; no prompt was shown.
    Rejected,
    /// Execution was attempted and failed. Never retried.
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Executed
                | TransferState::Cancelled
                | TransferState::Rejected
                | TransferState::Failed
        )
    }

    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Parsed, Validated)
                | (Parsed, Rejected)
                | (Validated, AwaitingConfirmation)
                | (AwaitingConfirmation, Confirmed)
                | (AwaitingConfirmation, Cancelled)
                | (Confirmed, Executed)
                | (Confirmed, Failed)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferState::Parsed => "parsed",
            TransferState::Validated => "validated",
            TransferState::AwaitingConfirmation => "awaiting_confirmation",
            TransferState::Confirmed => "confirmed",
            TransferState::Executed => "executed",
            TransferState::Cancelled => "cancelled",
            TransferState::Rejected => "rejected",
            TransferState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transfer transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TransferState,
    pub to: TransferState,
}

impl From<InvalidTransition> for BotError {
    fn from(err: InvalidTransition) -> Self {
        tracing::error!(error = %err, "Transfer state machine violated");
        BotError::ServiceUnavailable(err.to_string())
    }
}

/// One transfer attempt as it moves through the state machine. Lives only
/// for the duration of a single command or callback.
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    user_id: ChatUserId,
    proposal: TransferProposal,
    state: TransferState,
}

impl TransferAttempt {
    pub fn parsed(user_id: ChatUserId, proposal: TransferProposal) -> Self {
        Self {
            user_id,
            proposal,
            state: TransferState::Parsed,
        }
    }

    /// Rebuilds an attempt from a confirm/cancel click.
    pub fn awaiting_confirmation(user_id: ChatUserId, proposal: TransferProposal) -> Self {
        Self {
            user_id,
            proposal,
            state: TransferState::AwaitingConfirmation,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn proposal(&self) -> &TransferProposal {
        &self.proposal
    }

    pub fn advance(&mut self, next: TransferState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(
            user_id = %self.user_id,
            from = %self.state,
            to = %next,
            amount = %self.proposal.amount,
            "Transfer state changed"
        );
        self.state = next;
        Ok(())
    }
}

pub struct TransferWorkflow {
    sessions: Arc<dyn SessionStore>,
    wallet_api: Arc<dyn WalletApiProvider>,
    pending: Arc<PendingTransfers>,
    clock: Arc<dyn Clock>,
    api_timeout: Duration,
}

impl TransferWorkflow {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        wallet_api: Arc<dyn WalletApiProvider>,
        pending: Arc<PendingTransfers>,
        clock: Arc<dyn Clock>,
        api_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            wallet_api,
            pending,
            clock,
            api_timeout,
        }
    }

    /// Validates `proposal` with the backend and, if accepted, renders the
    /// confirmation prompt. A rejected proposal never produces a prompt.
    pub async fn propose(
        &self,
        session: &Session,
        proposal: TransferProposal,
    ) -> Result<BotReply, BotError> {
        let mut attempt = TransferAttempt::parsed(session.user_id.clone(), proposal);
        let client = self
            .wallet_api
            .client(&session.credential, self.api_timeout)?;

        let validation = match client.validate_transfer(attempt.proposal()).await {
            Ok(validation) if validation.valid => validation,
            Ok(validation) => {
                attempt.advance(TransferState::Rejected)?;
                return Ok(replies::validation_rejected(&validation.errors));
            }
            Err(BotError::Validation(errors)) => {
                attempt.advance(TransferState::Rejected)?;
                return Ok(replies::validation_rejected(&errors));
            }
            Err(err) => return Err(err),
        };
        attempt.advance(TransferState::Validated)?;

        attempt.advance(TransferState::AwaitingConfirmation)?;
        let key = self.pending.issue(&session.user_id);
        let payload = ConfirmPayload::new(attempt.proposal(), Some(key));
        let encoded = payload
            .encode()
            .map_err(|e| BotError::ServiceUnavailable(format!("encode confirm payload: {}", e)))?;
        let reply = replies::confirmation_prompt(
            attempt.proposal(),
            &validation,
            encoded.clone(),
            Some(encoded),
        );

        tracing::info!(
            user_id = %session.user_id,
            amount = %attempt.proposal().amount,
            recipient_type = %attempt.proposal().recipient_type,
            key = %key,
            "Transfer awaiting confirmation"
        );
        Ok(reply)
    }

    /// Handles a `confirm_transfer` click from `user_id`.
    pub async fn confirm(&self, user_id: &ChatUserId, value: Option<&str>) -> BotReply {
        match self.try_confirm(user_id, value).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "Transfer confirmation failed");
                replies::transfer_failed(&err)
            }
        }
    }

    async fn try_confirm(
        &self,
        user_id: &ChatUserId,
        value: Option<&str>,
    ) -> Result<BotReply, BotError> {
        let payload = decode_payload(value)?;
        let mut attempt = TransferAttempt::awaiting_confirmation(user_id.clone(), payload.to_proposal());

        // Looked up fresh: a logout or expiry since the prompt was shown wins.
        let session = self
            .sessions
            .get(user_id)
            .await
            .ok_or(BotError::SessionExpired)?;

        if let Some(key) = payload.key {
            match self.pending.claim(key, user_id) {
                ClaimOutcome::Claimed => {}
                outcome => {
                    tracing::warn!(
                        user_id = %user_id,
                        key = %key,
                        ?outcome,
                        "Rejected confirmation for unavailable key"
                    );
                    return Err(BotError::ConfirmationUnavailable);
                }
            }
        }
        attempt.advance(TransferState::Confirmed)?;

        let client = self
            .wallet_api
            .client(&session.credential, self.api_timeout)?;
        match client.create_transfer(attempt.proposal(), payload.key).await {
            Ok(result) => {
                attempt.advance(TransferState::Executed)?;
                tracing::info!(
                    user_id = %user_id,
                    transfer_id = %result.transfer_id,
                    reference_id = %result.reference_id,
                    status = %result.status,
                    "Transfer executed"
                );
                Ok(replies::receipt(&result, self.clock.now()))
            }
            Err(err) => {
                attempt.advance(TransferState::Failed)?;
                Err(err)
            }
        }
    }

    /// Handles a `cancel_transfer` click. Never calls the backend.
    pub fn cancel(&self, user_id: &ChatUserId, value: Option<&str>) -> BotReply {
        if let Some(payload) = value.and_then(|raw| ConfirmPayload::decode(raw).ok()) {
            let mut attempt =
                TransferAttempt::awaiting_confirmation(user_id.clone(), payload.to_proposal());
            if let Err(err) = attempt.advance(TransferState::Cancelled) {
                return replies::transfer_failed(&err.into());
            }
            if let Some(key) = payload.key {
                self.pending.release(key, user_id);
            }
        }
        tracing::info!(user_id = %user_id, "Transfer cancelled by user");
        replies::transfer_cancelled()
    }
}

fn decode_payload(value: Option<&str>) -> Result<ConfirmPayload, BotError> {
    let raw = value
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| BotError::validation("This confirmation is missing its transfer details."))?;
    ConfirmPayload::decode(raw).map_err(|e| {
        tracing::warn!(error = %e, "Malformed confirm payload");
        BotError::validation("This confirmation could not be read. Please run `/send-money` again.")
    })
}
