// Copyright 2025 Cowboy AI, LLC.

//! Fire-and-forget notification publishing
//!
//! Inbox notifications are best-effort and never fail the transition that
//! triggered them. The cancellation compensation publish is the exception:
//! its acceptance gates record deletion, so it returns a result.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::fabric::{channels, FabricError, MessageFabric};
use crate::lookup::AllowanceMessage;

/// Body of an inbox notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    /// The request the recipient should look at
    pub request_id: Uuid,
    /// Recipient username
    pub username: String,
}

/// Publishes inbox and compensation messages over the fabric
#[derive(Clone)]
pub struct NotificationPublisher {
    fabric: Arc<dyn MessageFabric>,
}

impl NotificationPublisher {
    /// Create a publisher over the given fabric
    pub fn new(fabric: Arc<dyn MessageFabric>) -> Self {
        Self { fabric }
    }

    /// Drop a notification into a user's inbox.
    ///
    /// Failures are logged and swallowed; notification is not part of the
    /// transactional contract.
    pub async fn notify(&self, request_id: Uuid, username: &str) {
        let message = InboxMessage {
            request_id,
            username: username.to_string(),
        };
        let payload = match serde_json::to_vec(&message) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(%request_id, username, error = %e, "failed to encode inbox notification");
                return;
            }
        };
        if let Err(e) = self
            .fabric
            .publish(channels::INBOX_NOTIFICATION, None, None, payload)
            .await
        {
            warn!(%request_id, username, error = %e, "inbox notification publish failed");
        }
    }

    /// Publish a compensation message restoring a held amount to the user's
    /// allowance. The message carries the request id so downstream
    /// restoration can deduplicate retried cancellations.
    pub async fn notify_cancellation(
        &self,
        request_id: Uuid,
        username: &str,
        amount_cents: u64,
    ) -> Result<(), FabricError> {
        let message = CompensationMessage {
            request_id,
            allowance: AllowanceMessage {
                username: username.to_string(),
                amount_cents,
            },
        };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| FabricError::PublishRejected {
                destination: channels::CANCELLATION_COMPENSATION.to_string(),
                reason: e.to_string(),
            })?;
        self.fabric
            .publish(
                channels::CANCELLATION_COMPENSATION,
                None,
                None,
                Bytes::from(payload),
            )
            .await
    }
}

/// Body of a cancellation compensation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationMessage {
    /// Cancelled request, the idempotency key for restoration
    pub request_id: Uuid,
    /// Who gets the amount back, and how much
    #[serde(flatten)]
    pub allowance: AllowanceMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationRegistry;
    use crate::fabric::InMemoryFabric;

    #[tokio::test]
    async fn notify_publishes_to_inbox() {
        let fabric = Arc::new(InMemoryFabric::new(CorrelationRegistry::new()));
        let publisher = NotificationPublisher::new(fabric.clone());

        let id = Uuid::new_v4();
        publisher.notify(id, "boss").await;

        let published = fabric.published_to(channels::INBOX_NOTIFICATION);
        assert_eq!(published.len(), 1);
        let message: InboxMessage = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(message.request_id, id);
        assert_eq!(message.username, "boss");
    }

    #[tokio::test]
    async fn notify_swallows_publish_failure() {
        let fabric = Arc::new(InMemoryFabric::new(CorrelationRegistry::new()));
        fabric.fail_on(channels::INBOX_NOTIFICATION);
        let publisher = NotificationPublisher::new(fabric);

        // Must not panic or surface an error.
        publisher.notify(Uuid::new_v4(), "boss").await;
    }

    #[tokio::test]
    async fn cancellation_failure_is_surfaced() {
        let fabric = Arc::new(InMemoryFabric::new(CorrelationRegistry::new()));
        fabric.fail_on(channels::CANCELLATION_COMPENSATION);
        let publisher = NotificationPublisher::new(fabric);

        let result = publisher
            .notify_cancellation(Uuid::new_v4(), "jdoe", 12_345)
            .await;
        assert!(result.is_err());
    }
}
