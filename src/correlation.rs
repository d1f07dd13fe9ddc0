// Copyright 2025 Cowboy AI, LLC.

//! Correlation registry turning one-way message flows into awaitable calls
//!
//! Each outbound request message carries a fresh correlation token. The
//! caller registers the token here and suspends on the returned handle; the
//! fabric's delivery task completes the token when a response carrying it
//! arrives. Entries are single-use: the first completion wins, late or
//! duplicate completions are discarded, and a timed-out or dropped waiter
//! removes its entry so it can never be completed after the fact.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

/// Opaque unique token matching a response to its originating call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Generate a fresh token with enough entropy to make collision
    /// effectively impossible
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The token as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a pending reply resolved without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    /// No response arrived within the allowed window
    TimedOut,
    /// The registry was shut down while the call was outstanding
    Cancelled,
}

struct RegistryInner {
    waiters: HashMap<CorrelationToken, oneshot::Sender<Bytes>>,
    shut_down: bool,
}

/// Thread-safe map from correlation token to a pending one-shot completion cell
///
/// Owned by the message fabric adapter and shared with the calling clients;
/// register and complete are atomic with respect to each other.
#[derive(Clone)]
pub struct CorrelationRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                waiters: HashMap::new(),
                shut_down: false,
            })),
        }
    }

    /// Register a token and obtain the handle its response will resolve.
    ///
    /// Fails if the token is already registered or the registry has been
    /// shut down.
    pub fn register(&self, token: CorrelationToken) -> DomainResult<PendingReply> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if inner.shut_down {
                return Err(DomainError::RegistryShutDown);
            }
            if inner.waiters.contains_key(&token) {
                return Err(DomainError::DuplicateCorrelationToken(token.to_string()));
            }
            inner.waiters.insert(token.clone(), tx);
        }
        Ok(PendingReply {
            token,
            receiver: rx,
            registry: self.clone(),
        })
    }

    /// Complete a pending token with a response payload.
    ///
    /// Returns true iff a waiter existed and observed the value. Completing
    /// an unknown or already-resolved token is a silent no-op, which makes
    /// duplicate delivery harmless.
    pub fn complete(&self, token: &CorrelationToken, payload: Bytes) -> bool {
        let sender = {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.waiters.remove(token)
        };
        match sender {
            Some(tx) => tx.send(payload).is_ok(),
            None => {
                debug!(%token, "discarding response for unknown or resolved token");
                false
            }
        }
    }

    /// Number of outstanding registrations
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .waiters
            .len()
    }

    /// Drain all waiters and reject further registrations.
    ///
    /// Outstanding calls resolve with `ReplyError::Cancelled`.
    pub fn shutdown(&self) {
        let drained = {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.shut_down = true;
            inner.waiters.drain().count()
        };
        if drained > 0 {
            warn!(drained, "correlation registry shut down with pending calls");
        }
    }

    fn remove(&self, token: &CorrelationToken) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .waiters
            .remove(token)
            .is_some()
    }
}

/// Handle held by a caller awaiting a correlated response
pub struct PendingReply {
    token: CorrelationToken,
    receiver: oneshot::Receiver<Bytes>,
    registry: CorrelationRegistry,
}

impl PendingReply {
    /// The token this handle is waiting on
    pub fn token(&self) -> &CorrelationToken {
        &self.token
    }

    /// Wait for the correlated response, up to `timeout`.
    ///
    /// On timeout the registry entry is removed first, so a response arriving
    /// afterwards is discarded rather than delivered to a vanished waiter.
    pub async fn await_within(mut self, timeout: Duration) -> Result<Bytes, ReplyError> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(ReplyError::Cancelled),
            Err(_) => {
                if self.registry.remove(&self.token) {
                    return Err(ReplyError::TimedOut);
                }
                // A completion raced the timeout and already took the
                // sender; honor it if the value made it across.
                match self.receiver.try_recv() {
                    Ok(payload) => Ok(payload),
                    Err(_) => Err(ReplyError::TimedOut),
                }
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        // A waiter that gives up must leave nothing completable behind.
        self.registry.remove(&self.token);
    }
}
