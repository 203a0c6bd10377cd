//! Transfer proposals, their confirm-button encoding, and backend transfer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::types::IdempotencyKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Upi,
    Phone,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::Upi => "upi",
            RecipientType::Phone => "phone",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecipientType::Upi => "UPI",
            RecipientType::Phone => "Phone",
        }
    }
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientType {
    type Err = String;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upi" => Ok(RecipientType::Upi),
            "phone" => Ok(RecipientType::Phone),
            other => Err(format!(
                "Recipient type must be `upi` or `phone`, got `{}`",
                other
            )),
        }
    }
}

/// A money movement the user wants to make. Not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct TransferProposal {
    #[validate(length(min = 1, max = 32))]
    pub amount: String,
    pub recipient_type: RecipientType,
    #[validate(length(min = 1, max = 256))]
    pub recipient_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

impl TransferProposal {
    pub fn new(
        amount: impl Into<String>,
        recipient_type: RecipientType,
        recipient_value: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            recipient_type,
            recipient_value: recipient_value.into(),
            recipient_name: None,
            description: None,
        }
    }
}

/// Body of `POST /transfers/validate`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateTransferRequest<'a> {
    pub amount: &'a str,
    pub recipient_type: RecipientType,
    pub recipient_value: &'a str,
}

impl<'a> From<&'a TransferProposal> for ValidateTransferRequest<'a> {
    fn from(proposal: &'a TransferProposal) -> Self {
        Self {
            amount: &proposal.amount,
            recipient_type: proposal.recipient_type,
            recipient_value: &proposal.recipient_value,
        }
    }
}

/// Value carried by the `confirm_transfer` button. This is the only place a
/// validated proposal lives between the validate and confirm steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPayload {
    pub amount: String,
    pub recipient_type: RecipientType,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<IdempotencyKey>,
}

impl ConfirmPayload {
    pub fn new(proposal: &TransferProposal, key: Option<IdempotencyKey>) -> Self {
        Self {
            amount: proposal.amount.clone(),
            recipient_type: proposal.recipient_type,
            recipient: proposal.recipient_value.clone(),
            key,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_proposal(&self) -> TransferProposal {
        TransferProposal::new(
            self.amount.clone(),
            self.recipient_type,
            self.recipient.clone(),
        )
    }
}

/// Response of `POST /transfers/validate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferValidation {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub transfer_fee: Option<String>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TransferRecipient {
    Detailed {
        #[serde(alias = "type")]
        recipient_type: Option<String>,
        #[serde(alias = "value")]
        recipient_value: Option<String>,
        #[serde(default, alias = "name")]
        recipient_name: Option<String>,
    },
    Plain(String),
}

impl fmt::Display for TransferRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferRecipient::Plain(value) => f.write_str(value),
            TransferRecipient::Detailed {
                recipient_value,
                recipient_name,
                ..
            } => {
                let value = recipient_value.as_deref().unwrap_or("unknown");
                match recipient_name {
                    Some(name) if !name.is_empty() => write!(f, "{} ({})", name, value),
                    _ => f.write_str(value),
                }
            }
        }
    }
}

/// Authoritative record of an executed transfer, as returned by `POST /transfers`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferResult {
    pub transfer_id: String,
    pub reference_id: String,
    #[serde(deserialize_with = "decimal::required")]
    pub amount: String,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub transfer_fee: Option<String>,
    #[serde(default, deserialize_with = "decimal::optional")]
    pub total_amount: Option<String>,
    pub status: String,
    pub recipient: Option<TransferRecipient>,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Backend amounts arrive either as JSON strings or numbers; both are kept as text.
pub(crate) mod decimal {
    use super::*;
    use serde_json::Value;

    fn to_text<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(E::custom(format!("expected decimal, got {}", other))),
        }
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        to_text(Value::deserialize(deserializer)?)
    }

    pub fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        to_text(Value::deserialize(deserializer)?)?
            .ok_or_else(|| serde::de::Error::custom("decimal value is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recipient_type_parse_is_case_sensitive() {
        assert_eq!("upi".parse::<RecipientType>(), Ok(RecipientType::Upi));
        assert_eq!("phone".parse::<RecipientType>(), Ok(RecipientType::Phone));
        assert!("UPI".parse::<RecipientType>().is_err());
        assert!("Phone".parse::<RecipientType>().is_err());
        assert!("bank".parse::<RecipientType>().is_err());
    }

    #[test]
    fn confirm_payload_uses_camel_case_wire_names() {
        let proposal = TransferProposal::new("100", RecipientType::Upi, "user@bank");
        let encoded = ConfirmPayload::new(&proposal, None).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({"amount": "100", "recipientType": "upi", "recipient": "user@bank"})
        );
    }

    #[test]
    fn confirm_payload_reconstructs_identical_proposal() {
        let proposal = TransferProposal::new("1250.50", RecipientType::Phone, "+919876543210");
        let key = IdempotencyKey::new();
        let encoded = ConfirmPayload::new(&proposal, Some(key)).encode().unwrap();
        let decoded = ConfirmPayload::decode(&encoded).unwrap();
        assert_eq!(decoded.key, Some(key));
        assert_eq!(decoded.to_proposal(), proposal);
    }

    #[test]
    fn confirm_payload_without_key_is_accepted() {
        let decoded =
            ConfirmPayload::decode(r#"{"amount":"5","recipientType":"phone","recipient":"999"}"#)
                .unwrap();
        assert_eq!(decoded.key, None);
        assert_eq!(decoded.recipient_type, RecipientType::Phone);
    }

    #[test]
    fn validation_response_accepts_numeric_amounts() {
        let parsed: TransferValidation = serde_json::from_value(json!({
            "valid": true,
            "errors": [],
            "warnings": ["Large transfer"],
            "transfer_fee": 2.5,
            "total_amount": "102.50",
            "estimated_time": "Instant"
        }))
        .unwrap();
        assert_eq!(parsed.transfer_fee.as_deref(), Some("2.5"));
        assert_eq!(parsed.total_amount.as_deref(), Some("102.50"));
        assert_eq!(parsed.warnings, vec!["Large transfer".to_string()]);
    }

    #[test]
    fn transfer_result_accepts_object_or_string_recipient() {
        let detailed: TransferResult = serde_json::from_value(json!({
            "transfer_id": "tr_1",
            "reference_id": "ref_1",
            "amount": 100,
            "status": "completed",
            "recipient": {"type": "upi", "value": "user@bank", "name": "Asha"}
        }))
        .unwrap();
        assert_eq!(detailed.amount, "100");
        assert_eq!(
            detailed.recipient.unwrap().to_string(),
            "Asha (user@bank)"
        );

        let plain: TransferResult = serde_json::from_value(json!({
            "transfer_id": "tr_2",
            "reference_id": "ref_2",
            "amount": "5",
            "status": "pending",
            "recipient": "999"
        }))
        .unwrap();
        assert_eq!(plain.recipient.unwrap().to_string(), "999");
    }

    #[test]
    fn proposal_validation_rejects_oversized_fields() {
        let mut proposal = TransferProposal::new("1", RecipientType::Upi, "a@b");
        assert!(proposal.validate().is_ok());
        proposal.recipient_value = "x".repeat(300);
        assert!(proposal.validate().is_err());
    }
}
