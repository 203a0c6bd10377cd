//! Text rendering for every message the bot sends.

use chrono::{DateTime, Utc};

use crate::error::BotError;
use crate::models::{
    message::{
        ActionButton, BotReply, ButtonStyle, CANCEL_TRANSFER_ACTION, CONFIRM_TRANSFER_ACTION,
    },
    session::Session,
    transfer::{TransferProposal, TransferResult, TransferValidation},
    wallet::WalletBalance,
};
use crate::utils::time::format_timestamp;

pub const HELP_TEXT: &str = "*Wallet bot commands*\n\
• `/auth <api-key>` - log in with an API key from your wallet dashboard\n\
• `/fetch-balance` - show your wallet balance\n\
• `/send-money <amount> <upi|phone> <recipient>` - start a transfer, e.g. `/send-money 100 upi user@bank`\n\
• `/logout` - end your session\n\
• `/help` - show this message\n\
Sessions expire after a period of inactivity.";

fn money(amount: &str) -> String {
    format!("₹{}", amount)
}

pub fn help() -> BotReply {
    BotReply::text(HELP_TEXT)
}

pub fn unknown_command(name: &str) -> BotReply {
    BotReply::text(format!("Unknown command `{}`.\n\n{}", name, HELP_TEXT))
}

pub fn authenticated(session: &Session) -> BotReply {
    let minutes = (session.expires_at - session.last_activity_at).num_minutes();
    BotReply::text(format!(
        "✅ Authenticated. Your session stays active for {} minutes after your last command.",
        minutes
    ))
}

pub fn auth_failed(err: &BotError) -> BotReply {
    match err {
        BotError::Authentication => BotReply::text(
            "❌ Authentication failed: the API key was rejected. Check the key and try `/auth <api-key>` again.",
        ),
        other => BotReply::text(format!("❌ Authentication failed. {}", other.user_message())),
    }
}

pub fn logged_out(had_session: bool) -> BotReply {
    if had_session {
        BotReply::text("👋 You have been logged out.")
    } else {
        BotReply::text("You were not logged in.")
    }
}

pub fn balance(balance: &WalletBalance) -> BotReply {
    let mut lines = vec![format!(
        "💰 *Wallet balance:* {} {}",
        money(&balance.balance),
        balance.currency
    )];
    if let Some(available) = &balance.available_balance {
        lines.push(format!("Available: {} {}", money(available), balance.currency));
    }
    if let Some(updated_at) = balance.updated_at {
        lines.push(format!("Updated: {}", format_timestamp(updated_at)));
    }
    BotReply::text(lines.join("\n"))
}

pub fn error(err: &BotError) -> BotReply {
    BotReply::text(err.user_message())
}

/// Confirmation prompt. `confirm_value` is the encoded proposal.
pub fn confirmation_prompt(
    proposal: &TransferProposal,
    validation: &TransferValidation,
    confirm_value: String,
    cancel_value: Option<String>,
) -> BotReply {
    let mut lines = vec![
        "*Confirm transfer*".to_string(),
        format!("Amount: {}", money(&proposal.amount)),
    ];
    if let Some(fee) = &validation.transfer_fee {
        lines.push(format!("Fee: {}", money(fee)));
    }
    if let Some(total) = &validation.total_amount {
        lines.push(format!("Total: {}", money(total)));
    }
    lines.push(format!(
        "Recipient: {} ({})",
        proposal.recipient_value,
        proposal.recipient_type.label()
    ));
    if let Some(eta) = &validation.estimated_time {
        lines.push(format!("Estimated completion: {}", eta));
    }
    for warning in &validation.warnings {
        lines.push(format!("⚠️ {}", warning));
    }

    BotReply::text(lines.join("\n"))
        .with_action(ActionButton {
            action_id: CONFIRM_TRANSFER_ACTION.to_string(),
            text: "Confirm".to_string(),
            value: Some(confirm_value),
            style: Some(ButtonStyle::Primary),
        })
        .with_action(ActionButton {
            action_id: CANCEL_TRANSFER_ACTION.to_string(),
            text: "Cancel".to_string(),
            value: cancel_value,
            style: Some(ButtonStyle::Danger),
        })
}

pub fn validation_rejected(errors: &[String]) -> BotReply {
    let mut lines = vec!["❌ Transfer cannot be made:".to_string()];
    if errors.is_empty() {
        lines.push("• The wallet service rejected this transfer.".to_string());
    }
    lines.extend(errors.iter().map(|e| format!("• {}", e)));
    BotReply::text(lines.join("\n"))
}

/// `submitted_at` is only shown when the backend reports neither a
/// completion nor a creation time.
pub fn receipt(result: &TransferResult, submitted_at: DateTime<Utc>) -> BotReply {
    let timestamp_line = match result.completed_at {
        Some(completed_at) => format!("Completed at: {}", format_timestamp(completed_at)),
        None => format!(
            "Submitted at: {}",
            format_timestamp(result.created_at.unwrap_or(submitted_at))
        ),
    };
    let mut lines = vec![
        "✅ *Transfer submitted*".to_string(),
        format!("Transfer ID: {}", result.transfer_id),
        format!("Reference ID: {}", result.reference_id),
        format!("Amount: {}", money(&result.amount)),
    ];
    if let Some(fee) = &result.transfer_fee {
        lines.push(format!("Fee: {}", money(fee)));
    }
    if let Some(total) = &result.total_amount {
        lines.push(format!("Total debited: {}", money(total)));
    }
    if let Some(recipient) = &result.recipient {
        lines.push(format!("Recipient: {}", recipient));
    }
    lines.push(format!("Status: {}", result.status));
    if let Some(eta) = &result.estimated_time {
        lines.push(format!("Estimated completion: {}", eta));
    }
    lines.push(timestamp_line);
    BotReply::replacement(lines.join("\n"))
}

pub fn transfer_failed(err: &BotError) -> BotReply {
    match err {
        BotError::SessionExpired | BotError::ConfirmationUnavailable => {
            BotReply::replacement(err.user_message())
        }
        BotError::Validation(errors) => {
            let mut reply = validation_rejected(errors);
            reply.replace_original = true;
            reply
        }
        other => BotReply::replacement(format!(
            "❌ Transfer was not completed. {}\nRun `/send-money` again to retry.",
            other.user_message()
        )),
    }
}

pub fn transfer_cancelled() -> BotReply {
    BotReply::replacement("🚫 Transfer cancelled. No money was moved.")
}
