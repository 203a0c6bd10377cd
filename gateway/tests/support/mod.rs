#![allow(dead_code)]
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use wallet_bot_gateway::{
    config::Config,
    error::BotError,
    models::{
        message::{BotReply, CONFIRM_TRANSFER_ACTION},
        session::ApiKey,
        transfer::{TransferProposal, TransferResult, TransferValidation},
        wallet::WalletBalance,
    },
    services::{
        command_router::Command,
        session_store::{InMemorySessionStore, SessionStore},
        wallet_api::{WalletApi, WalletApiProvider},
    },
    state::AppState,
    types::{ChatUserId, IdempotencyKey},
    utils::time::{Clock, ManualClock},
};

pub const GOOD_KEY: &str = "sk_test_good";
pub const BAD_KEY: &str = "bad-key";

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().expect("bind addr"),
        wallet_api_base_url: "http://wallet.invalid".into(),
        session_timeout_minutes: 60,
        session_sweep_interval_seconds: 300,
        max_sessions: 100,
        api_timeout_seconds: 5,
        auth_probe_timeout_seconds: 2,
        pending_transfer_ttl_seconds: 900,
        chat_signing_secret: None,
    }
}

pub fn user(id: &str) -> ChatUserId {
    ChatUserId::new(id)
}

/// Everything the fake backend saw, shared across every client it hands out.
#[derive(Default)]
pub struct BackendCalls {
    balance: AtomicUsize,
    validate: AtomicUsize,
    create: AtomicUsize,
    credentials: Mutex<Vec<String>>,
    validated: Mutex<Vec<TransferProposal>>,
    created: Mutex<Vec<(TransferProposal, Option<IdempotencyKey>)>>,
}

impl BackendCalls {
    pub fn balance_calls(&self) -> usize {
        self.balance.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.balance_calls() + self.validate_calls() + self.create_calls()
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().expect("lock").clone()
    }

    pub fn validated(&self) -> Vec<TransferProposal> {
        self.validated.lock().expect("lock").clone()
    }

    pub fn created(&self) -> Vec<(TransferProposal, Option<IdempotencyKey>)> {
        self.created.lock().expect("lock").clone()
    }
}

/// In-process stand-in for the wallet backend. Rejects [`BAD_KEY`] with 401
/// semantics and accepts any other credential.
pub struct FakeWalletBackend {
    pub calls: Arc<BackendCalls>,
    validation: Mutex<Result<TransferValidation, BotError>>,
    create_error: Mutex<Option<BotError>>,
    balance_error: Mutex<Option<BotError>>,
}

impl FakeWalletBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Arc::new(BackendCalls::default()),
            validation: Mutex::new(Ok(accepted_validation())),
            create_error: Mutex::new(None),
            balance_error: Mutex::new(None),
        })
    }

    pub fn set_validation(&self, validation: Result<TransferValidation, BotError>) {
        *self.validation.lock().expect("lock") = validation;
    }

    pub fn fail_create_with(&self, err: BotError) {
        *self.create_error.lock().expect("lock") = Some(err);
    }

    /// Balance reads fail with `err` from now on. Login also reads the
    /// balance, so call this after [`Harness::login`].
    pub fn fail_balance_with(&self, err: BotError) {
        *self.balance_error.lock().expect("lock") = Some(err);
    }
}

pub fn accepted_validation() -> TransferValidation {
    TransferValidation {
        valid: true,
        errors: vec![],
        warnings: vec![],
        transfer_fee: Some("0.00".into()),
        total_amount: None,
        estimated_time: Some("Instant".into()),
    }
}

pub fn rejected_validation(errors: &[&str]) -> TransferValidation {
    TransferValidation {
        valid: false,
        errors: errors.iter().map(|e| e.to_string()).collect(),
        warnings: vec![],
        transfer_fee: None,
        total_amount: None,
        estimated_time: None,
    }
}

struct FakeWalletClient {
    backend: Arc<FakeWalletBackend>,
    credential: String,
}

#[async_trait]
impl WalletApi for FakeWalletClient {
    async fn get_balance(&self) -> Result<WalletBalance, BotError> {
        self.backend.calls.balance.fetch_add(1, Ordering::SeqCst);
        if self.credential == BAD_KEY {
            return Err(BotError::Authentication);
        }
        if let Some(err) = self.backend.balance_error.lock().expect("lock").clone() {
            return Err(err);
        }
        Ok(WalletBalance {
            balance: "1520.75".into(),
            currency: "INR".into(),
            available_balance: Some("1500.00".into()),
            updated_at: None,
        })
    }

    async fn validate_transfer(
        &self,
        proposal: &TransferProposal,
    ) -> Result<TransferValidation, BotError> {
        self.backend.calls.validate.fetch_add(1, Ordering::SeqCst);
        self.backend
            .calls
            .validated
            .lock()
            .expect("lock")
            .push(proposal.clone());
        self.backend.validation.lock().expect("lock").clone()
    }

    async fn create_transfer(
        &self,
        proposal: &TransferProposal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Result<TransferResult, BotError> {
        let n = self.backend.calls.create.fetch_add(1, Ordering::SeqCst) + 1;
        self.backend
            .calls
            .created
            .lock()
            .expect("lock")
            .push((proposal.clone(), idempotency_key));
        if let Some(err) = self.backend.create_error.lock().expect("lock").clone() {
            return Err(err);
        }
        Ok(TransferResult {
            transfer_id: format!("tr_{}", n),
            reference_id: format!("ref_{}", n),
            amount: proposal.amount.clone(),
            transfer_fee: Some("0.00".into()),
            total_amount: Some(proposal.amount.clone()),
            status: "completed".into(),
            recipient: None,
            estimated_time: None,
            created_at: None,
            completed_at: None,
        })
    }
}

pub struct FakeProvider(pub Arc<FakeWalletBackend>);

impl WalletApiProvider for FakeProvider {
    fn client(
        &self,
        credential: &ApiKey,
        _timeout: Duration,
    ) -> Result<Arc<dyn WalletApi>, BotError> {
        self.0
            .calls
            .credentials
            .lock()
            .expect("lock")
            .push(credential.expose().to_string());
        Ok(Arc::new(FakeWalletClient {
            backend: self.0.clone(),
            credential: credential.expose().to_string(),
        }))
    }
}

/// Fully wired gateway over the fake backend and a manual clock.
pub struct Harness {
    pub state: AppState,
    pub backend: Arc<FakeWalletBackend>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
            config.session_timeout(),
            config.max_sessions,
            shared_clock.clone(),
        ));
        let backend = FakeWalletBackend::new();
        let provider: Arc<dyn WalletApiProvider> = Arc::new(FakeProvider(backend.clone()));
        let state = AppState::new(config, sessions, provider, shared_clock);
        Self {
            state,
            backend,
            clock,
        }
    }

    pub fn calls(&self) -> &BackendCalls {
        &self.backend.calls
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(ChronoDuration::minutes(minutes));
    }

    pub async fn command(&self, user_id: &str, name: &str, text: &str) -> BotReply {
        self.state
            .router
            .dispatch(&user(user_id), Command::parse(name, text))
            .await
    }

    pub async fn click(&self, user_id: &str, action_id: &str, value: Option<&str>) -> BotReply {
        self.state
            .router
            .handle_action(&user(user_id), action_id, value)
            .await
    }

    pub async fn login(&self, user_id: &str) {
        let reply = self.command(user_id, "/auth", GOOD_KEY).await;
        assert!(reply.text.contains("Authenticated"), "login failed: {}", reply.text);
    }
}

pub fn confirm_value(reply: &BotReply) -> String {
    reply
        .action(CONFIRM_TRANSFER_ACTION)
        .and_then(|a| a.value.clone())
        .expect("confirmation prompt carries a confirm value")
}
