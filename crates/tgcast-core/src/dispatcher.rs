//! Sequential broadcast loop.
//!
//! One broadcast walks `Validating -> ListingRecipients -> NotifyingOperator ->
//! Delivering -> Completed`, and can fail out of any state:
//! - nothing is sent if validation or listing fails
//! - no recipient is contacted unless the operator's progress message exists
//! - per-recipient failures are classified and tallied, never propagated
//! - progress edits are best-effort

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChannelId, Credential, MessageRef, RecipientId, RecipientSet},
    errors::Error,
    locks::ChannelLocks,
    messaging::{DeliveryOutcome, MessagingClient},
    progress::{format_progress, BroadcastStats, FAILURE_TEXT, START_MARKER},
    store::RecipientStore,
    Result,
};

#[derive(Clone, Debug)]
pub struct BroadcastRequest {
    pub channel: ChannelId,
    pub text: String,
    pub operator: RecipientId,
    pub credential: Credential,
}

impl BroadcastRequest {
    pub fn validate(&self) -> Result<()> {
        self.channel.validate()?;
        if self.text.trim().is_empty() {
            return Err(Error::Validation("message text is empty".to_string()));
        }
        if self.operator.as_str().trim().is_empty() {
            return Err(Error::Validation("operator id is empty".to_string()));
        }
        if self.credential.expose().trim().is_empty() {
            return Err(Error::Validation("credential is empty".to_string()));
        }
        Ok(())
    }
}

pub struct BroadcastDispatcher {
    store: Arc<dyn RecipientStore>,
    messenger: Arc<dyn MessagingClient>,
    locks: ChannelLocks,
    shutdown: CancellationToken,
}

impl BroadcastDispatcher {
    pub fn new(store: Arc<dyn RecipientStore>, messenger: Arc<dyn MessagingClient>) -> Self {
        Self {
            store,
            messenger,
            locks: ChannelLocks::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop in-flight broadcasts (between recipients) once `token` fires.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecipientStore> {
        &self.store
    }

    pub async fn broadcast(&self, req: &BroadcastRequest) -> Result<BroadcastStats> {
        req.validate()?;

        // Registry reads are not snapshot-isolated, so broadcasts on one
        // channel run one at a time.
        let _guard = self.locks.lock_channel(&req.channel).await;

        let recipients = self.store.list(&req.channel).await?;
        let mut stats = BroadcastStats::new(recipients.len());
        tracing::info!(
            channel = %req.channel,
            operator = %req.operator,
            total = stats.total,
            "broadcast started"
        );

        let progress = self
            .messenger
            .send(&req.operator, START_MARKER, &req.credential)
            .await
            .map_err(|e| {
                tracing::warn!(
                    channel = %req.channel,
                    operator = %req.operator,
                    error = %e,
                    "failed to notify operator"
                );
                Error::OperatorNotify(e)
            })?;

        match self
            .deliver_all(req, &recipients, &progress, &mut stats)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    channel = %req.channel,
                    total = stats.total,
                    success = stats.success,
                    blocked = stats.blocked,
                    deleted = stats.deleted,
                    failed = stats.failed,
                    "broadcast completed"
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(
                    channel = %req.channel,
                    processed = stats.processed(),
                    total = stats.total,
                    error = %e,
                    "broadcast aborted"
                );
                if let Err(edit_err) = self
                    .messenger
                    .edit(&progress, FAILURE_TEXT, &req.credential)
                    .await
                {
                    tracing::warn!(
                        channel = %req.channel,
                        error = %edit_err,
                        "failed to mark progress message as failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn deliver_all(
        &self,
        req: &BroadcastRequest,
        recipients: &RecipientSet,
        progress: &MessageRef,
        stats: &mut BroadcastStats,
    ) -> Result<()> {
        for recipient in recipients {
            if self.shutdown.is_cancelled() {
                return Err(Error::Interrupted);
            }

            let outcome = self.deliver_one(req, recipient).await;
            stats.record(outcome);
            self.report_progress(req, progress, stats).await;
        }
        Ok(())
    }

    async fn deliver_one(
        &self,
        req: &BroadcastRequest,
        recipient: &RecipientId,
    ) -> DeliveryOutcome {
        match self
            .messenger
            .send(recipient, &req.text, &req.credential)
            .await
        {
            Ok(_) => DeliveryOutcome::Success,
            Err(e) => {
                let outcome = e.outcome();
                tracing::debug!(
                    channel = %req.channel,
                    %recipient,
                    %outcome,
                    error = %e,
                    "delivery failed"
                );
                outcome
            }
        }
    }

    async fn report_progress(
        &self,
        req: &BroadcastRequest,
        progress: &MessageRef,
        stats: &BroadcastStats,
    ) {
        let text = format_progress(stats);
        if let Err(e) = self.messenger.edit(progress, &text, &req.credential).await {
            tracing::warn!(
                channel = %req.channel,
                processed = stats.processed(),
                error = %e,
                "progress update failed"
            );
        }
    }
}
