//! Client for the wallet backend REST API.
//!
//! Every client is bound to exactly one credential. Rotating a credential
//! means building a new client through [`WalletApiProvider`]; nothing is
//! shared between clients, so headers can never leak across users.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
    Client, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BotError;
use crate::models::{
    session::ApiKey,
    transfer::{TransferProposal, TransferResult, TransferValidation, ValidateTransferRequest},
    wallet::WalletBalance,
};
use crate::types::IdempotencyKey;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const USER_AGENT: &str = "wallet-bot-gateway/1.0";
const MAX_LOGGED_BODY_CHARS: usize = 512;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// `GET /wallet/balance`. Also serves as the authentication check.
    async fn get_balance(&self) -> Result<WalletBalance, BotError>;

    /// `POST /transfers/validate`.
    async fn validate_transfer(
        &self,
        proposal: &TransferProposal,
    ) -> Result<TransferValidation, BotError>;

    /// `POST /transfers`.
    async fn create_transfer(
        &self,
        proposal: &TransferProposal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Result<TransferResult, BotError>;
}

/// Builds backend clients scoped to a single credential.
#[cfg_attr(test, mockall::automock)]
pub trait WalletApiProvider: Send + Sync {
    fn client(&self, credential: &ApiKey, timeout: Duration)
        -> Result<Arc<dyn WalletApi>, BotError>;
}

#[derive(Debug, Clone)]
pub struct HttpWalletApiProvider {
    base_url: String,
}

impl HttpWalletApiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl WalletApiProvider for HttpWalletApiProvider {
    fn client(
        &self,
        credential: &ApiKey,
        timeout: Duration,
    ) -> Result<Arc<dyn WalletApi>, BotError> {
        Ok(Arc::new(HttpWalletApi::new(
            &self.base_url,
            credential,
            timeout,
        )?))
    }
}

pub struct HttpWalletApi {
    client: Client,
    base_url: String,
}

impl HttpWalletApi {
    pub fn new(base_url: &str, credential: &ApiKey, timeout: Duration) -> Result<Self, BotError> {
        let mut key = HeaderValue::from_str(credential.expose())
            .map_err(|_| BotError::validation("API key contains invalid characters"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Network(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WalletApi for HttpWalletApi {
    async fn get_balance(&self) -> Result<WalletBalance, BotError> {
        let path = "/wallet/balance";
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode_response(path, response).await
    }

    async fn validate_transfer(
        &self,
        proposal: &TransferProposal,
    ) -> Result<TransferValidation, BotError> {
        let path = "/transfers/validate";
        let response = self
            .client
            .post(self.url(path))
            .json(&ValidateTransferRequest::from(proposal))
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode_response(path, response).await
    }

    async fn create_transfer(
        &self,
        proposal: &TransferProposal,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Result<TransferResult, BotError> {
        let path = "/transfers";
        let mut request = self.client.post(self.url(path)).json(proposal);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key.to_string());
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;
        decode_response(path, response).await
    }
}

/// Error body the backend uses for non-2xx responses.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl BackendErrorBody {
    fn messages(&self) -> Vec<String> {
        let listed: Vec<String> = self
            .details
            .as_ref()
            .and_then(|details| details.get("errors"))
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if !listed.is_empty() {
            return listed;
        }
        self.error.iter().cloned().collect()
    }
}

async fn decode_response<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, BotError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                return BotError::Timeout;
            }
            tracing::warn!(path, error = %e, "Wallet API returned an unreadable body");
            BotError::ServiceUnavailable(format!("unreadable response from {}", path))
        });
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        path,
        status = status.as_u16(),
        body = %truncate(&body),
        "Wallet API request failed"
    );
    Err(classify_error_response(status, retry_after.as_deref(), &body))
}

/// Maps a non-2xx backend response onto the user-facing error taxonomy.
pub fn classify_error_response(status: StatusCode, retry_after: Option<&str>, body: &str) -> BotError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BotError::Authentication,
        StatusCode::TOO_MANY_REQUESTS => BotError::RateLimited {
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let parsed: BackendErrorBody = serde_json::from_str(body).unwrap_or_default();
            let messages = parsed.messages();
            if messages.is_empty() {
                BotError::validation("The wallet service rejected the request")
            } else {
                BotError::Validation(messages)
            }
        }
        status => BotError::ServiceUnavailable(format!("unexpected status {}", status.as_u16())),
    }
}

fn transport_error(path: &str, err: reqwest::Error) -> BotError {
    if err.is_timeout() {
        tracing::warn!(path, "Wallet API request timed out");
        return BotError::Timeout;
    }
    tracing::warn!(path, error = %err, "Wallet API request could not be sent");
    BotError::Network(err.to_string())
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        return body.to_string();
    }
    let preview: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
    format!("{}... (truncated)", preview)
}
