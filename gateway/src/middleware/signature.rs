use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    state::AppState,
    utils::security::{verify_request_signature, SignatureError},
};

pub const TIMESTAMP_HEADER: &str = "x-chat-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-chat-signature";
const MAX_SIGNED_BODY_BYTES: usize = 256 * 1024;

/// Rejects chat-platform requests whose signature does not match the
/// configured signing secret. A no-op when no secret is configured.
pub async fn verify_chat_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(secret) = state.config.chat_signing_secret.as_deref() else {
        return next.run(req).await;
    };

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_SIGNED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return AppError::BadRequest("Request body too large".into()).into_response(),
    };

    let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
    if let Err(err) = verify_request_signature(
        secret,
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
        &bytes,
        state.clock.now(),
    ) {
        let reason = match err {
            SignatureError::MissingHeaders => "Missing signature headers",
            SignatureError::InvalidTimestamp => "Invalid request timestamp",
            SignatureError::Stale => "Request timestamp too old",
            SignatureError::Mismatch => "Invalid request signature",
        };
        return AppError::Unauthorized(reason.into()).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
