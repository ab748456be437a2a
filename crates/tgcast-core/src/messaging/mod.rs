//! Provider-facing messaging abstractions (Telegram today).

pub mod port;
pub mod types;

pub use port::MessagingClient;
pub use types::{DeliveryOutcome, ProviderError};
