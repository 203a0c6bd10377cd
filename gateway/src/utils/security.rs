use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_VERSION: &str = "v0";
/// Signed requests older (or newer) than this are rejected as replays.
pub const MAX_SIGNATURE_AGE_SECONDS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    MissingHeaders,
    InvalidTimestamp,
    Stale,
    Mismatch,
}

pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.chars().count())
}

/// Computes `v0=<hex hmac>` over `v0:{timestamp}:{body}`.
pub fn sign_request(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mac = compute_hmac(secret.as_bytes(), timestamp, body);
    format!("{}={}", SIGNATURE_VERSION, hex::encode(mac))
}

pub fn verify_request_signature(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::MissingHeaders);
    };

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if now.timestamp().abs_diff(sent_at) > MAX_SIGNATURE_AGE_SECONDS.unsigned_abs() {
        return Err(SignatureError::Stale);
    }

    let provided = signature
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Mismatch)?;

    let mut mac = new_mac(secret.as_bytes());
    mac.update(signed_base(timestamp, body).as_slice());
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

fn signed_base(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut base = format!("{}:{}:", SIGNATURE_VERSION, timestamp).into_bytes();
    base.extend_from_slice(body);
    base
}

fn compute_hmac(key: &[u8], timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut mac = new_mac(key);
    mac.update(signed_base(timestamp, body).as_slice());
    mac.finalize().into_bytes().to_vec()
}

// HMAC accepts keys of any length, so this cannot fail.
#[allow(clippy::expect_used)]
fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size")
}
