use async_trait::async_trait;

use crate::{
    domain::{Credential, MessageRef, RecipientId},
    messaging::types::ProviderError,
};

/// Outbound messaging port.
///
/// The credential travels with every call because one process serves many
/// channels, each with its own provider token.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send(
        &self,
        to: &RecipientId,
        text: &str,
        credential: &Credential,
    ) -> Result<MessageRef, ProviderError>;

    async fn edit(
        &self,
        msg: &MessageRef,
        text: &str,
        credential: &Credential,
    ) -> Result<(), ProviderError>;
}
