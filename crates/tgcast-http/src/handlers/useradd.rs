use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::Response};
use serde::Deserialize;

use tgcast_core::{
    domain::{ChannelId, RecipientId},
    errors::Error,
    store::Registration,
};

use super::{parse_body, text_field, Reply};
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserAddBody {
    pub bot_id: Option<serde_json::Value>,
    pub user_id: Option<serde_json::Value>,
}

pub async fn handle_useradd(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let body: UserAddBody = parse_body(&body);
    let (Some(bot_id), Some(user_id)) = (text_field(&body.bot_id), text_field(&body.user_id))
    else {
        return Reply::fail("bot_id and user_id are required")
            .into_response_with(StatusCode::BAD_REQUEST);
    };

    let channel = ChannelId::new(bot_id);
    let recipient = RecipientId::new(user_id);

    match state.store.register(&channel, &recipient).await {
        Ok(registration) => {
            if registration == Registration::AlreadyPresent {
                tracing::debug!(%channel, %recipient, "useradd: already registered");
            }
            Reply::ok(format!("User {recipient} added to bot {channel}"))
                .into_response_with(StatusCode::OK)
        }
        Err(e @ Error::Validation(_)) => Reply::fail("Invalid bot_id")
            .with_error(e)
            .into_response_with(StatusCode::BAD_REQUEST),
        Err(e) => {
            tracing::error!(%channel, %recipient, error = %e, "useradd failed");
            Reply::fail("Error adding user")
                .with_error(e)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
