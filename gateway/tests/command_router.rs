mod support;

use std::time::Duration;

use support::{Harness, BAD_KEY, GOOD_KEY};
use wallet_bot_gateway::{
    error::BotError, models::message::CONFIRM_TRANSFER_ACTION,
    services::session_store::SessionStore,
};

#[tokio::test]
async fn auth_then_fetch_balance_succeeds() {
    let harness = Harness::new();

    let reply = harness.command("U1", "/auth", GOOD_KEY).await;
    assert!(reply.text.contains("Authenticated"));
    let session = harness
        .state
        .sessions
        .get(&support::user("U1"))
        .await
        .expect("session created");
    assert!(session.authenticated);
    assert_eq!(harness.calls().balance_calls(), 1, "auth checks the balance once");

    let reply = harness.command("U1", "/fetch-balance", "").await;
    assert!(reply.text.contains("Wallet balance"), "{}", reply.text);
    assert!(reply.text.contains("₹1520.75"));
    assert_eq!(harness.calls().balance_calls(), 2);
    assert_eq!(harness.calls().credentials(), vec![GOOD_KEY, GOOD_KEY]);
}

#[tokio::test]
async fn malformed_send_money_fails_without_network() {
    let harness = Harness::new();
    harness.login("U1").await;
    let before = harness.calls().total_calls();

    let reply = harness.command("U1", "/send-money", "abc").await;

    assert!(reply.text.contains("Invalid format"), "{}", reply.text);
    assert!(reply.actions.is_empty());
    assert_eq!(harness.calls().total_calls(), before);
}

#[tokio::test]
async fn malformed_send_money_without_session_still_reports_format() {
    let harness = Harness::new();

    let reply = harness.command("U1", "send-money", "100 upi").await;

    assert!(reply.text.contains("Invalid format"));
    assert_eq!(harness.calls().total_calls(), 0);
}

#[tokio::test]
async fn session_commands_without_session_ask_to_authenticate() {
    let harness = Harness::new();

    for (name, text) in [("/fetch-balance", ""), ("/send-money", "100 upi a@bank")] {
        let reply = harness.command("U1", name, text).await;
        assert!(reply.text.contains("authenticate again"), "{}", reply.text);
    }
    assert_eq!(harness.calls().total_calls(), 0);
}

#[tokio::test]
async fn logout_then_fetch_balance_makes_no_backend_call() {
    let harness = Harness::new();
    harness.login("U1").await;

    let reply = harness.command("U1", "/logout", "").await;
    assert!(reply.text.contains("logged out"));
    let before = harness.calls().total_calls();

    let reply = harness.command("U1", "/fetch-balance", "").await;
    assert!(reply.text.contains("authenticate again"));
    assert_eq!(harness.calls().total_calls(), before);
}

#[tokio::test]
async fn logout_without_session_is_harmless() {
    let harness = Harness::new();
    let reply = harness.command("U1", "/logout", "").await;
    assert!(reply.text.contains("not logged in"));
}

#[tokio::test]
async fn reauthentication_replaces_credential() {
    let harness = Harness::new();
    harness.login("U1").await;

    let reply = harness.command("U1", "/auth", "sk_test_rotated").await;
    assert!(reply.text.contains("Authenticated"));
    harness.command("U1", "/fetch-balance", "").await;

    let credentials = harness.calls().credentials();
    assert_eq!(credentials.last().map(String::as_str), Some("sk_test_rotated"));
    let session = harness
        .state
        .sessions
        .get(&support::user("U1"))
        .await
        .expect("session");
    assert_eq!(session.credential.expose(), "sk_test_rotated");
}

#[tokio::test]
async fn failed_reauthentication_keeps_existing_session() {
    let harness = Harness::new();
    harness.login("U1").await;

    let reply = harness.command("U1", "/auth", BAD_KEY).await;
    assert!(reply.text.contains("Authentication failed"), "{}", reply.text);

    let session = harness
        .state
        .sessions
        .get(&support::user("U1"))
        .await
        .expect("previous session survives");
    assert_eq!(session.credential.expose(), GOOD_KEY);
}

#[tokio::test]
async fn rejected_credential_creates_no_session() {
    let harness = Harness::new();

    let reply = harness.command("U1", "/auth", BAD_KEY).await;

    assert!(reply.text.contains("Authentication failed"));
    assert!(harness.state.sessions.get(&support::user("U1")).await.is_none());
}

#[tokio::test]
async fn blank_credential_is_rejected_without_backend_call() {
    let harness = Harness::new();

    let reply = harness.command("U1", "/auth", "   ").await;

    assert!(reply.text.contains("Authentication failed"));
    assert_eq!(harness.calls().total_calls(), 0);
}

#[tokio::test]
async fn activity_keeps_session_alive_past_original_expiry() {
    let harness = Harness::new();
    harness.login("U1").await;

    harness.advance_minutes(45);
    let reply = harness.command("U1", "/fetch-balance", "").await;
    assert!(reply.text.contains("Wallet balance"));

    harness.advance_minutes(45);
    let reply = harness.command("U1", "/fetch-balance", "").await;
    assert!(reply.text.contains("Wallet balance"), "{}", reply.text);

    harness.advance_minutes(61);
    let reply = harness.command("U1", "/fetch-balance", "").await;
    assert!(reply.text.contains("authenticate again"));
}

#[tokio::test]
async fn help_and_unknown_commands_list_usage() {
    let harness = Harness::new();

    let help = harness.command("U1", "/help", "").await;
    assert!(help.text.contains("/send-money"));

    let unknown = harness.command("U1", "/balance", "").await;
    assert!(unknown.text.contains("Unknown command `/balance`"));
    assert!(unknown.text.contains("/fetch-balance"));
    assert_eq!(harness.calls().total_calls(), 0);
}

#[tokio::test]
async fn unknown_action_is_ignored() {
    let harness = Harness::new();
    harness.login("U1").await;

    let reply = harness.click("U1", "approve_everything", Some("{}")).await;

    assert!(reply.replace_original);
    assert!(reply.action(CONFIRM_TRANSFER_ACTION).is_none());
    assert_eq!(harness.calls().create_calls(), 0);
}

#[tokio::test]
async fn rate_limited_balance_reports_retry_hint() {
    let harness = Harness::new();
    harness.login("U1").await;
    let err = BotError::RateLimited {
        retry_after: Some(Duration::from_secs(30)),
    };
    harness.backend.fail_balance_with(err.clone());

    let reply = harness.command("U1", "/fetch-balance", "").await;

    assert_eq!(reply.text, err.user_message());
    assert!(reply.text.contains("30 seconds"), "{}", reply.text);
}

#[tokio::test]
async fn revoked_key_on_balance_asks_to_reauthenticate() {
    let harness = Harness::new();
    harness.login("U1").await;
    harness.backend.fail_balance_with(BotError::Authentication);

    let reply = harness.command("U1", "/fetch-balance", "").await;

    assert_eq!(reply.text, BotError::Authentication.user_message());
}

#[tokio::test]
async fn rate_limited_send_money_reports_without_prompt() {
    let harness = Harness::new();
    harness.login("U1").await;
    let err = BotError::RateLimited { retry_after: None };
    harness.backend.set_validation(Err(err.clone()));

    let reply = harness.command("U1", "/send-money", "100 upi user@bank").await;

    assert_eq!(reply.text, err.user_message());
    assert!(reply.action(CONFIRM_TRANSFER_ACTION).is_none());
    assert_eq!(harness.calls().create_calls(), 0);
}

#[tokio::test]
async fn revoked_key_on_send_money_asks_to_reauthenticate() {
    let harness = Harness::new();
    harness.login("U1").await;
    harness.backend.set_validation(Err(BotError::Authentication));

    let reply = harness.command("U1", "/send-money", "100 upi user@bank").await;

    assert_eq!(reply.text, BotError::Authentication.user_message());
    assert!(reply.action(CONFIRM_TRANSFER_ACTION).is_none());
    assert_eq!(harness.calls().create_calls(), 0);
}
