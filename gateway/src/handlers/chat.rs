use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::message::BotReply,
    services::command_router::Command,
    state::AppState,
    types::ChatUserId,
};

type HandlerResult<T> = Result<T, AppError>;

/// Slash-command form posted by the chat platform. Unlisted fields are ignored.
#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub user: InteractionUser,
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractionAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

pub async fn handle_command(
    State(state): State<AppState>,
    form: Result<Form<SlashCommandForm>, FormRejection>,
) -> HandlerResult<Json<BotReply>> {
    let Form(form) = form.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let user_id = require_user(&form.user_id)?;

    let command = Command::parse(&form.command, &form.text);
    let reply = state.router.dispatch(&user_id, command).await;
    Ok(Json(reply))
}

pub async fn handle_interaction(
    State(state): State<AppState>,
    form: Result<Form<InteractionForm>, FormRejection>,
) -> HandlerResult<Json<BotReply>> {
    let Form(form) = form.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let payload: InteractionPayload = serde_json::from_str(&form.payload)?;
    let user_id = require_user(&payload.user.id)?;

    // Only the first action is meaningful; the platform sends one per click.
    let action = payload
        .actions
        .first()
        .ok_or_else(|| AppError::BadRequest("Interaction carries no actions".into()))?;

    tracing::debug!(
        user_id = %user_id,
        kind = payload.kind.as_deref().unwrap_or("unknown"),
        action_id = %action.action_id,
        "Received interaction callback"
    );

    let reply = state
        .router
        .handle_action(&user_id, &action.action_id, action.value.as_deref())
        .await;
    Ok(Json(reply))
}

fn require_user(raw: &str) -> HandlerResult<ChatUserId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("user_id is required".into()));
    }
    Ok(ChatUserId::new(trimmed))
}
