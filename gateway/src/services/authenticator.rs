use std::sync::Arc;
use std::time::Duration;

use crate::error::BotError;
use crate::models::session::{ApiKey, Session};
use crate::services::{session_store::SessionStore, wallet_api::WalletApiProvider};
use crate::types::ChatUserId;

/// Turns a raw credential into a session, but only if the backend accepts it.
pub struct Authenticator {
    sessions: Arc<dyn SessionStore>,
    wallet_api: Arc<dyn WalletApiProvider>,
    check_timeout: Duration,
}

impl Authenticator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        wallet_api: Arc<dyn WalletApiProvider>,
        check_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            wallet_api,
            check_timeout,
        }
    }

    /// Checks `credential` against the backend and creates a session on success.
    /// A failed balance check leaves any existing session for the user untouched.
    pub async fn authenticate(
        &self,
        user_id: &ChatUserId,
        credential: ApiKey,
    ) -> Result<Session, BotError> {
        if credential.is_blank() {
            return Err(BotError::validation(
                "Usage: `/auth <api-key>`. The API key must not be empty.",
            ));
        }

        let client = self.wallet_api.client(&credential, self.check_timeout)?;
        if let Err(err) = client.get_balance().await {
            tracing::warn!(
                user_id = %user_id,
                credential = %credential,
                error = %err,
                "Authentication balance check failed"
            );
            return Err(err);
        }

        let session = self.sessions.create(user_id, credential).await;
        tracing::info!(
            user_id = %user_id,
            expires_at = %session.expires_at,
            "Chat user authenticated"
        );
        Ok(session)
    }
}
