use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, time::Duration};

/// Upper bounds keep session and confirmation expiry representable as
/// `chrono` timestamps.
pub const MAX_SESSION_TIMEOUT_MINUTES: u64 = 30 * 24 * 60;
pub const MAX_PENDING_TRANSFER_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub wallet_api_base_url: String,
    pub session_timeout_minutes: u64,
    pub session_sweep_interval_seconds: u64,
    pub max_sessions: usize,
    pub api_timeout_seconds: u64,
    pub auth_probe_timeout_seconds: u64,
    pub pending_transfer_ttl_seconds: u64,
    pub chat_signing_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            wallet_api_base_url: "http://localhost:8080/api/v1".to_string(),
            session_timeout_minutes: 60,
            session_sweep_interval_seconds: 300,
            max_sessions: 10_000,
            api_timeout_seconds: 30,
            auth_probe_timeout_seconds: 10,
            pending_transfer_ttl_seconds: 900,
            chat_signing_secret: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let bind_addr_raw = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr: SocketAddr = bind_addr_raw
            .parse()
            .map_err(|_| anyhow!("Invalid BIND_ADDR value: {}", bind_addr_raw))?;

        let wallet_api_base_url = env::var("WALLET_API_BASE_URL")
            .unwrap_or(defaults.wallet_api_base_url)
            .trim_end_matches('/')
            .to_string();
        if !wallet_api_base_url.starts_with("http://") && !wallet_api_base_url.starts_with("https://")
        {
            return Err(anyhow!(
                "Invalid WALLET_API_BASE_URL value: {}",
                wallet_api_base_url
            ));
        }

        let chat_signing_secret = env::var("CHAT_SIGNING_SECRET")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Config {
            bind_addr,
            wallet_api_base_url,
            session_timeout_minutes: parse_bounded(
                "SESSION_TIMEOUT_MINUTES",
                defaults.session_timeout_minutes,
                MAX_SESSION_TIMEOUT_MINUTES,
            ),
            session_sweep_interval_seconds: parse_positive(
                "SESSION_SWEEP_INTERVAL_SECONDS",
                defaults.session_sweep_interval_seconds,
            ),
            max_sessions: parse_positive("MAX_SESSIONS", defaults.max_sessions as u64) as usize,
            api_timeout_seconds: parse_positive("API_TIMEOUT_SECONDS", defaults.api_timeout_seconds),
            auth_probe_timeout_seconds: parse_positive(
                "AUTH_PROBE_TIMEOUT_SECONDS",
                defaults.auth_probe_timeout_seconds,
            ),
            pending_transfer_ttl_seconds: parse_bounded(
                "PENDING_TRANSFER_TTL_SECONDS",
                defaults.pending_transfer_ttl_seconds,
                MAX_PENDING_TRANSFER_TTL_SECONDS,
            ),
            chat_signing_secret,
        })
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        let minutes = self.session_timeout_minutes.min(MAX_SESSION_TIMEOUT_MINUTES);
        chrono::Duration::minutes(minutes as i64)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_seconds)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }

    pub fn auth_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_probe_timeout_seconds)
    }

    pub fn pending_transfer_ttl(&self) -> chrono::Duration {
        let seconds = self
            .pending_transfer_ttl_seconds
            .min(MAX_PENDING_TRANSFER_TTL_SECONDS);
        chrono::Duration::seconds(seconds as i64)
    }
}

fn parse_positive(key: &str, default: u64) -> u64 {
    parse_positive_value(env::var(key).ok(), default)
}

fn parse_bounded(key: &str, default: u64, max: u64) -> u64 {
    parse_bounded_value(env::var(key).ok(), default, max)
}

fn parse_bounded_value(raw: Option<String>, default: u64, max: u64) -> u64 {
    parse_positive_value(raw, default).min(max)
}

fn parse_positive_value(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
