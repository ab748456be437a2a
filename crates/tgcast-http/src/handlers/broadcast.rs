use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::Response};
use serde::Deserialize;

use tgcast_core::{
    dispatcher::BroadcastRequest,
    domain::{ChannelId, Credential, RecipientId},
    errors::Error,
};

use super::{parse_body, text_field, Reply};
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BroadcastBody {
    pub bot_id: Option<serde_json::Value>,
    pub text: Option<serde_json::Value>,
    pub admin_id: Option<serde_json::Value>,
    pub token: Option<serde_json::Value>,
}

impl BroadcastBody {
    fn into_request(self) -> Option<BroadcastRequest> {
        Some(BroadcastRequest {
            channel: ChannelId::new(text_field(&self.bot_id)?),
            text: text_field(&self.text)?,
            operator: RecipientId::new(text_field(&self.admin_id)?),
            credential: Credential::new(text_field(&self.token)?),
        })
    }
}

/// Runs the whole delivery loop before replying; the operator follows
/// progress through the live status message meanwhile.
///
/// The loop runs on its own task so a client hanging up mid-broadcast does
/// not stop delivery.
pub async fn handle_broadcast(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(req) = parse_body::<BroadcastBody>(&body).into_request() else {
        return Reply::fail("bot_id, text, bot token, and admin_id are required")
            .into_response_with(StatusCode::BAD_REQUEST);
    };

    let channel = req.channel.clone();
    let dispatcher = state.dispatcher.clone();
    let run = state
        .broadcasts
        .spawn(async move { dispatcher.broadcast(&req).await });

    let result = match run.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(%channel, error = %e, "broadcast task panicked");
            return Reply::fail("Error during broadcast")
                .with_error(e)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match result {
        Ok(stats) => Reply::ok("Broadcast completed with live updates")
            .with_stats(stats)
            .into_response_with(StatusCode::OK),
        Err(e @ Error::Validation(_)) => Reply::fail("Invalid broadcast request")
            .with_error(e)
            .into_response_with(StatusCode::BAD_REQUEST),
        Err(Error::OperatorNotify(_)) => {
            Reply::fail("Failed to notify admin about broadcast start")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            tracing::error!(%channel, error = %e, "broadcast failed");
            Reply::fail("Error during broadcast")
                .with_error(e)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
