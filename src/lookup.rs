// Copyright 2025 Cowboy AI, LLC.

//! Approver resolution and allowance adjustment clients
//!
//! Both calls are logically blocking RPCs built from two one-way message
//! flows: publish a request carrying a fresh correlation token and a
//! reply-to channel, then suspend on the correlation registry until the
//! routed response arrives or the configured window elapses.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::WorkflowConfig;
use crate::correlation::{CorrelationRegistry, CorrelationToken, ReplyError};
use crate::errors::{DomainError, DomainResult};
use crate::fabric::{channels, MessageFabric};

/// The three approving roles, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproverRole {
    /// Direct supervisor
    Supervisor,
    /// Department head
    DepartmentHead,
    /// Benefits coordinator
    Benco,
}

impl ApproverRole {
    /// Role name used in error messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            ApproverRole::Supervisor => "supervisor",
            ApproverRole::DepartmentHead => "department-head",
            ApproverRole::Benco => "benco",
        }
    }

    /// The (request, response) channel pair for this role's lookup
    pub fn lookup_channels(&self) -> (&'static str, &'static str) {
        match self {
            ApproverRole::Supervisor => (
                channels::SUPERVISOR_LOOKUP,
                channels::SUPERVISOR_LOOKUP_RESPONSE,
            ),
            ApproverRole::DepartmentHead => (
                channels::DEPARTMENT_HEAD_LOOKUP,
                channels::DEPARTMENT_HEAD_LOOKUP_RESPONSE,
            ),
            ApproverRole::Benco => (channels::BENCO_LOOKUP, channels::BENCO_LOOKUP_RESPONSE),
        }
    }
}

/// Resolved approver identity, ephemeral and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverIdentity {
    /// Username of the approver
    pub username: String,
    /// Role the directory reports for them
    pub role: String,
}

impl ApproverIdentity {
    /// Whether the directory reports this person as a department head
    pub fn is_department_head(&self) -> bool {
        self.role.eq_ignore_ascii_case("DEPARTMENT_HEAD")
    }
}

/// Body of an allowance adjustment request and response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceMessage {
    /// Employee whose allowance is adjusted
    pub username: String,
    /// Amount in cents
    pub amount_cents: u64,
}

/// Client for the remote directory that knows approvers and allowances
#[derive(Clone)]
pub struct RemoteDirectory {
    fabric: Arc<dyn MessageFabric>,
    registry: CorrelationRegistry,
    config: WorkflowConfig,
}

impl RemoteDirectory {
    /// Create a client over the given fabric and registry
    pub fn new(
        fabric: Arc<dyn MessageFabric>,
        registry: CorrelationRegistry,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            fabric,
            registry,
            config,
        }
    }

    /// Resolve the approver of `username` for the given role.
    ///
    /// Fails with `ApproverLookupTimeout` when no response arrives within
    /// the configured window and `ApproverLookupUnavailable` when the
    /// fabric rejects the publish; either way the record-side caller sees a
    /// clean failure and no state was touched.
    #[instrument(skip(self))]
    pub async fn resolve_approver(
        &self,
        username: &str,
        role: ApproverRole,
    ) -> DomainResult<ApproverIdentity> {
        let (request_channel, response_channel) = role.lookup_channels();
        let token = CorrelationToken::generate();
        let pending = self.registry.register(token.clone())?;

        let payload = Bytes::from(serde_json::to_vec(username)?);
        self.fabric
            .publish(
                request_channel,
                Some(&token),
                Some(response_channel),
                payload,
            )
            .await
            .map_err(|e| DomainError::ApproverLookupUnavailable {
                role: role.name().to_string(),
                reason: e.to_string(),
            })?;

        let response = pending
            .await_within(self.config.lookup_timeout())
            .await
            .map_err(|e| match e {
                ReplyError::TimedOut => DomainError::ApproverLookupTimeout {
                    role: role.name().to_string(),
                },
                ReplyError::Cancelled => DomainError::ApproverLookupUnavailable {
                    role: role.name().to_string(),
                    reason: "registry shut down".to_string(),
                },
            })?;

        let approver: ApproverIdentity = serde_json::from_slice(&response)?;
        debug!(role = role.name(), approver = %approver.username, "resolved approver");
        Ok(approver)
    }

    /// Ask the directory to adjust `username`'s allowance for a requested
    /// amount, returning the amount actually covered.
    ///
    /// The remote party may return less than requested (partial coverage);
    /// a reply exceeding the request is clamped to the request.
    #[instrument(skip(self))]
    pub async fn adjust_allowance(
        &self,
        username: &str,
        requested_cents: u64,
    ) -> DomainResult<u64> {
        let token = CorrelationToken::generate();
        let pending = self.registry.register(token.clone())?;

        let request = AllowanceMessage {
            username: username.to_string(),
            amount_cents: requested_cents,
        };
        let payload = Bytes::from(serde_json::to_vec(&request)?);
        self.fabric
            .publish(
                channels::ALLOWANCE_ADJUSTMENT_REQUEST,
                Some(&token),
                Some(channels::ALLOWANCE_ADJUSTMENT_RESPONSE),
                payload,
            )
            .await
            .map_err(|e| DomainError::AllowanceAdjustmentUnavailable {
                reason: e.to_string(),
            })?;

        let response = pending
            .await_within(self.config.adjustment_timeout())
            .await
            .map_err(|e| match e {
                ReplyError::TimedOut => DomainError::AllowanceAdjustmentTimeout,
                ReplyError::Cancelled => DomainError::AllowanceAdjustmentUnavailable {
                    reason: "registry shut down".to_string(),
                },
            })?;

        let adjusted: AllowanceMessage = serde_json::from_slice(&response)?;
        Ok(adjusted.amount_cents.min(requested_cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::InMemoryFabric;

    fn directory_with(fabric: Arc<InMemoryFabric>, registry: CorrelationRegistry) -> RemoteDirectory {
        RemoteDirectory::new(
            fabric,
            registry,
            WorkflowConfig {
                lookup_timeout_secs: 1,
                adjustment_timeout_secs: 1,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn resolve_approver_round_trip() {
        let registry = CorrelationRegistry::new();
        let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
        fabric.respond_on(channels::SUPERVISOR_LOOKUP, |_msg| {
            let approver = ApproverIdentity {
                username: "boss".to_string(),
                role: "SUPERVISOR".to_string(),
            };
            Some(Bytes::from(serde_json::to_vec(&approver).unwrap()))
        });

        let directory = directory_with(fabric.clone(), registry);
        let approver = directory
            .resolve_approver("jdoe", ApproverRole::Supervisor)
            .await
            .unwrap();
        assert_eq!(approver.username, "boss");
        assert!(!approver.is_department_head());

        // Request carried the username and the reply-to channel.
        let published = fabric.published_to(channels::SUPERVISOR_LOOKUP);
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].reply_to.as_deref(),
            Some(channels::SUPERVISOR_LOOKUP_RESPONSE)
        );
        let sent: String = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(sent, "jdoe");
    }

    #[tokio::test]
    async fn lookup_without_response_times_out() {
        let registry = CorrelationRegistry::new();
        let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
        let directory = directory_with(fabric, registry);

        let err = directory
            .resolve_approver("jdoe", ApproverRole::Benco)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ApproverLookupTimeout { .. }));
    }

    #[tokio::test]
    async fn rejected_publish_surfaces_unavailable() {
        let registry = CorrelationRegistry::new();
        let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
        fabric.fail_on(channels::DEPARTMENT_HEAD_LOOKUP);
        let directory = directory_with(fabric, registry.clone());

        let err = directory
            .resolve_approver("jdoe", ApproverRole::DepartmentHead)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ApproverLookupUnavailable { .. }));
        // The registration was cleaned up with the failed call.
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn adjustment_returns_reduced_amount() {
        let registry = CorrelationRegistry::new();
        let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
        fabric.respond_on(channels::ALLOWANCE_ADJUSTMENT_REQUEST, |msg| {
            let request: AllowanceMessage = serde_json::from_slice(&msg.payload).unwrap();
            let reply = AllowanceMessage {
                username: request.username,
                amount_cents: 30_000,
            };
            Some(Bytes::from(serde_json::to_vec(&reply).unwrap()))
        });

        let directory = directory_with(fabric, registry);
        let adjusted = directory.adjust_allowance("jdoe", 50_000).await.unwrap();
        assert_eq!(adjusted, 30_000);
    }

    #[tokio::test]
    async fn adjustment_reply_is_clamped_to_request() {
        let registry = CorrelationRegistry::new();
        let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
        fabric.respond_on(channels::ALLOWANCE_ADJUSTMENT_REQUEST, |msg| {
            let request: AllowanceMessage = serde_json::from_slice(&msg.payload).unwrap();
            let reply = AllowanceMessage {
                username: request.username,
                amount_cents: 999_999,
            };
            Some(Bytes::from(serde_json::to_vec(&reply).unwrap()))
        });

        let directory = directory_with(fabric, registry);
        let adjusted = directory.adjust_allowance("jdoe", 50_000).await.unwrap();
        assert_eq!(adjusted, 50_000);
    }
}
