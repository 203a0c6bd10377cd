use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::transfer::decimal;

/// Response of `GET /wallet/balance`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalletBalance {
    #[serde(deserialize_with = "decimal::required")]
    pub balance: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub available_balance: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "INR".to_string()
}
