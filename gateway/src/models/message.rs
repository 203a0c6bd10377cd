//! Outbound chat messages.

use serde::{Deserialize, Serialize};

pub const CONFIRM_TRANSFER_ACTION: &str = "confirm_transfer";
pub const CANCEL_TRANSFER_ACTION: &str = "cancel_transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible only to the invoking user.
    #[default]
    Ephemeral,
    InChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// Interactive control attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub action_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub response_type: ResponseType,
    /// When set, the chat client replaces the message the callback came from.
    #[serde(default)]
    pub replace_original: bool,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionButton>,
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            replace_original: false,
            text: text.into(),
            actions: Vec::new(),
        }
    }

    /// Reply that replaces the interactive prompt it answers.
    pub fn replacement(text: impl Into<String>) -> Self {
        Self {
            replace_original: true,
            ..Self::text(text)
        }
    }

    pub fn with_action(mut self, action: ActionButton) -> Self {
        self.actions.push(action);
        self
    }

    pub fn action(&self, action_id: &str) -> Option<&ActionButton> {
        self.actions.iter().find(|a| a.action_id == action_id)
    }
}
