use std::path::PathBuf;

use crate::{domain::ChannelId, messaging::ProviderError};

/// Core error type for the dispatcher.
///
/// Adapter crates should map their specific errors into this type so the HTTP
/// surface can turn every failure into one definite verdict.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to notify operator: {0}")]
    OperatorNotify(ProviderError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("broadcast interrupted before all recipients were processed")]
    Interrupted,

    #[error("external error: {0}")]
    External(String),
}

/// Recipient registry failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown channel: {0}")]
    NotFound(ChannelId),

    #[error("registry i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
