use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        authenticator::Authenticator,
        command_router::CommandRouter,
        pending_transfers::PendingTransfers,
        session_store::{InMemorySessionStore, SessionStore},
        transfer_workflow::TransferWorkflow,
        wallet_api::{HttpWalletApiProvider, WalletApiProvider},
    },
    utils::time::{Clock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub pending: Arc<PendingTransfers>,
    pub router: Arc<CommandRouter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the services together around the given collaborators.
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        wallet_api: Arc<dyn WalletApiProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pending = Arc::new(PendingTransfers::new(
            config.pending_transfer_ttl(),
            clock.clone(),
        ));
        let authenticator = Authenticator::new(
            sessions.clone(),
            wallet_api.clone(),
            config.auth_probe_timeout(),
        );
        let workflow = TransferWorkflow::new(
            sessions.clone(),
            wallet_api.clone(),
            pending.clone(),
            clock.clone(),
            config.api_timeout(),
        );
        let router = CommandRouter::new(
            sessions.clone(),
            authenticator,
            workflow,
            wallet_api,
            config.api_timeout(),
        );

        Self {
            config,
            sessions,
            pending,
            router: Arc::new(router),
            clock,
        }
    }

    /// Production wiring: in-memory sessions, HTTP backend client, wall clock.
    pub fn from_config(config: Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
            config.session_timeout(),
            config.max_sessions,
            clock.clone(),
        ));
        let wallet_api: Arc<dyn WalletApiProvider> =
            Arc::new(HttpWalletApiProvider::new(config.wallet_api_base_url.clone()));
        Self::new(config, sessions, wallet_api, clock)
    }
}
