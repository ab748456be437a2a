//! Request handlers.
//!
//! Bodies are read as raw bytes and every field is optional at the serde
//! level, so a missing body, a wrong content type or a missing field all turn
//! into our own 400 reply instead of a framework rejection.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{de::DeserializeOwned, Serialize};

use tgcast_core::progress::BroadcastStats;

mod broadcast;
mod useradd;

pub use broadcast::{handle_broadcast, BroadcastBody};
pub use useradd::{handle_useradd, UserAddBody};

/// JSON reply shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BroadcastStats>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            stats: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
            stats: None,
        }
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_stats(mut self, stats: BroadcastStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> axum::response::Response {
        (status, Json(self)).into_response()
    }
}

/// Decode a JSON body; anything undecodable reads as an empty body.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    serde_json::from_slice::<Option<T>>(bytes)
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Read a body field as text. Integers are accepted (chat ids are often sent
/// as JSON numbers); blank strings and non-integral numbers count as missing.
pub(crate) fn text_field(value: &Option<serde_json::Value>) -> Option<String> {
    match value.as_ref()? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => n.as_i64().map(|n| n.to_string()),
        _ => None,
    }
}
