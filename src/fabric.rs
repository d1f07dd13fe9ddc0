// Copyright 2025 Cowboy AI, LLC.

//! Message fabric adapter
//!
//! Thin wrapper over the broker exposing a publish seam plus a response
//! router that feeds inbound messages from the fixed response channels into
//! the correlation registry. Delivery is at-least-once; duplicates are
//! harmless because correlation entries are single-use.

use async_nats::{Client, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::FabricConfig;
use crate::correlation::{CorrelationRegistry, CorrelationToken};

/// Logical channel names of the reimbursement messaging topology
pub mod channels {
    /// Supervisor lookup request channel
    pub const SUPERVISOR_LOOKUP: &str = "supervisor-lookup";
    /// Department head lookup request channel
    pub const DEPARTMENT_HEAD_LOOKUP: &str = "department-head-lookup";
    /// Benefits coordinator lookup request channel
    pub const BENCO_LOOKUP: &str = "benco-lookup";
    /// Allowance adjustment request channel
    pub const ALLOWANCE_ADJUSTMENT_REQUEST: &str = "allowance-adjustment-request";
    /// Compensation channel restoring allowance on cancellation
    pub const CANCELLATION_COMPENSATION: &str = "cancellation-compensation";
    /// Inbox notification channel
    pub const INBOX_NOTIFICATION: &str = "inbox-notification";

    /// Supervisor lookup response channel
    pub const SUPERVISOR_LOOKUP_RESPONSE: &str = "supervisor-lookup-response";
    /// Department head lookup response channel
    pub const DEPARTMENT_HEAD_LOOKUP_RESPONSE: &str = "department-head-lookup-response";
    /// Benefits coordinator lookup response channel
    pub const BENCO_LOOKUP_RESPONSE: &str = "benco-lookup-response";
    /// Allowance adjustment response channel
    pub const ALLOWANCE_ADJUSTMENT_RESPONSE: &str = "allowance-adjustment-response";

    /// The fixed set of response channels the router subscribes to
    pub const RESPONSE_CHANNELS: [&str; 4] = [
        SUPERVISOR_LOOKUP_RESPONSE,
        DEPARTMENT_HEAD_LOOKUP_RESPONSE,
        BENCO_LOOKUP_RESPONSE,
        ALLOWANCE_ADJUSTMENT_RESPONSE,
    ];
}

/// Header carrying the correlation token on request and response messages
pub const CORRELATION_HEADER: &str = "Correlation-Id";

/// Errors surfaced by the message fabric
#[derive(Debug, Error)]
pub enum FabricError {
    /// Failed to establish connection to the fabric
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The fabric rejected a publish
    #[error("Publish rejected on {destination}: {reason}")]
    PublishRejected {
        /// Destination channel of the failed publish
        destination: String,
        /// Underlying failure
        reason: String,
    },

    /// Failed to subscribe to a response channel
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),
}

/// Publish seam over the message fabric
///
/// `token` and `reply_to` are carried on the message envelope when present;
/// fire-and-forget publishes omit both.
#[async_trait]
pub trait MessageFabric: Send + Sync {
    /// Publish a payload to a destination channel
    async fn publish(
        &self,
        destination: &str,
        token: Option<&CorrelationToken>,
        reply_to: Option<&str>,
        payload: Bytes,
    ) -> Result<(), FabricError>;
}

/// NATS-backed message fabric
pub struct NatsFabric {
    client: Client,
}

impl NatsFabric {
    /// Connect to the fabric with the provided configuration
    pub async fn connect(config: &FabricConfig) -> Result<Self, FabricError> {
        let mut options = ConnectOptions::new()
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            options = options.user_and_password(user.clone(), password.clone());
        }

        let client = options.connect(&config.url).await.map_err(|e| {
            FabricError::ConnectionFailed(format!("Failed to connect to {}: {}", config.url, e))
        })?;

        Ok(Self { client })
    }

    /// Wrap an already-connected client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Subscribe to the fixed response channels and route every inbound
    /// message into the correlation registry.
    ///
    /// One task per channel; each extracts the correlation header and calls
    /// `complete`, so a pending call is woken without ever blocking the
    /// delivery loop on the caller.
    pub async fn spawn_response_router(
        &self,
        registry: CorrelationRegistry,
    ) -> Result<Vec<JoinHandle<()>>, FabricError> {
        let mut handles = Vec::with_capacity(channels::RESPONSE_CHANNELS.len());
        for channel in channels::RESPONSE_CHANNELS {
            let mut subscription = self
                .client
                .subscribe(channel)
                .await
                .map_err(|e| FabricError::SubscriptionFailed(format!("{channel}: {e}")))?;
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                while let Some(message) = subscription.next().await {
                    let token = message
                        .headers
                        .as_ref()
                        .and_then(|h| h.get(CORRELATION_HEADER))
                        .map(|v| CorrelationToken::from(v.as_str()));
                    match token {
                        Some(token) => {
                            if !registry.complete(&token, message.payload) {
                                debug!(channel, %token, "dropped uncorrelated response");
                            }
                        }
                        None => warn!(channel, "response message without correlation header"),
                    }
                }
            }));
        }
        Ok(handles)
    }
}

#[async_trait]
impl MessageFabric for NatsFabric {
    async fn publish(
        &self,
        destination: &str,
        token: Option<&CorrelationToken>,
        reply_to: Option<&str>,
        payload: Bytes,
    ) -> Result<(), FabricError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(CORRELATION_HEADER, token.as_str());
        }

        let subject = async_nats::Subject::from(destination.to_string());
        let result = match reply_to {
            Some(reply) => {
                self.client
                    .publish_with_reply_and_headers(
                        subject,
                        async_nats::Subject::from(reply.to_string()),
                        headers,
                        payload,
                    )
                    .await
            }
            None => {
                self.client
                    .publish_with_headers(subject, headers, payload)
                    .await
            }
        };

        result.map_err(|e| FabricError::PublishRejected {
            destination: destination.to_string(),
            reason: e.to_string(),
        })?;

        // Surface broker rejection now rather than on some later call.
        self.client
            .flush()
            .await
            .map_err(|e| FabricError::PublishRejected {
                destination: destination.to_string(),
                reason: e.to_string(),
            })
    }
}

/// A message observed by the in-memory fabric
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    /// Destination channel
    pub destination: String,
    /// Correlation token, when the publish was part of a call
    pub token: Option<CorrelationToken>,
    /// Reply-to channel, when the publish expects an answer
    pub reply_to: Option<String>,
    /// Message body
    pub payload: Bytes,
}

type Responder = dyn Fn(&PublishedMessage) -> Option<Bytes> + Send + Sync;

/// In-process fabric used by tests and local runs
///
/// Records every publish and, when a responder is scripted for a
/// destination, immediately completes the correlation registry with the
/// synthesized response, standing in for the remote party.
#[derive(Default)]
pub struct InMemoryFabric {
    registry: CorrelationRegistry,
    published: std::sync::Mutex<Vec<PublishedMessage>>,
    responders: std::sync::Mutex<std::collections::HashMap<String, Box<Responder>>>,
    failing: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl InMemoryFabric {
    /// Create a fabric wired to the given registry
    pub fn new(registry: CorrelationRegistry) -> Self {
        Self {
            registry,
            ..Default::default()
        }
    }

    /// Script the remote party for a destination channel
    pub fn respond_on<F>(&self, destination: &str, responder: F)
    where
        F: Fn(&PublishedMessage) -> Option<Bytes> + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(destination.to_string(), Box::new(responder));
    }

    /// Make publishes to a destination fail
    pub fn fail_on(&self, destination: &str) {
        self.failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(destination.to_string());
    }

    /// All messages published so far
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Messages published to one destination
    pub fn published_to(&self, destination: &str) -> Vec<PublishedMessage> {
        self.published()
            .into_iter()
            .filter(|m| m.destination == destination)
            .collect()
    }
}

#[async_trait]
impl MessageFabric for InMemoryFabric {
    async fn publish(
        &self,
        destination: &str,
        token: Option<&CorrelationToken>,
        reply_to: Option<&str>,
        payload: Bytes,
    ) -> Result<(), FabricError> {
        {
            let failing = self
                .failing
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if failing.contains(destination) {
                return Err(FabricError::PublishRejected {
                    destination: destination.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
        }

        let message = PublishedMessage {
            destination: destination.to_string(),
            token: token.cloned(),
            reply_to: reply_to.map(str::to_string),
            payload,
        };
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.clone());

        let response = {
            let responders = self
                .responders
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            responders.get(destination).and_then(|r| r(&message))
        };
        if let (Some(response), Some(token)) = (response, token) {
            self.registry.complete(token, response);
        }
        Ok(())
    }
}
