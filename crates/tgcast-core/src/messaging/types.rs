use std::fmt;

use serde::Serialize;

/// Per-recipient delivery result, tallied in `BroadcastStats`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Success,
    Blocked,
    Deleted,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Blocked => "blocked",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected or failed provider call.
///
/// `status` is `None` when no provider response was obtained at all
/// (connect error, timeout, undecodable body).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub description: String,
}

impl ProviderError {
    pub fn new(status: u16, description: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            description: description.into(),
        }
    }

    pub fn transport(description: impl Into<String>) -> Self {
        Self {
            status: None,
            description: description.into(),
        }
    }

    /// Classify a failed send.
    pub fn outcome(&self) -> DeliveryOutcome {
        match self.status {
            Some(403) => DeliveryOutcome::Blocked,
            Some(400) | Some(404) => DeliveryOutcome::Deleted,
            _ => DeliveryOutcome::Failed,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "provider error {code}: {}", self.description),
            None => write!(f, "transport error: {}", self.description),
        }
    }
}

impl std::error::Error for ProviderError {}
