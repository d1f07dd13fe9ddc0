// Copyright 2025 Cowboy AI, LLC.

//! Error types for reimbursement domain operations

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while driving a reimbursement request through its workflow
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Request record not found in the store
    #[error("Reimbursement request not found: {id}")]
    RequestNotFound {
        /// ID that was searched for
        id: Uuid,
    },

    /// Event date is too close to the submission date
    #[error("Insufficient notice: event requires {days_required} days notice, got {days_given}")]
    InsufficientNotice {
        /// Minimum lead time in days
        days_required: u32,
        /// Days between submission and the event
        days_given: i64,
    },

    /// Attachment content type is not on the allow-list
    #[error("Unsupported attachment type: {content_type}")]
    UnsupportedAttachmentType {
        /// The rejected content type
        content_type: String,
    },

    /// No approver-lookup response arrived within the configured window
    #[error("Approver lookup timed out for role {role}")]
    ApproverLookupTimeout {
        /// Role being resolved (supervisor, department head, benco)
        role: String,
    },

    /// The fabric rejected the approver-lookup publish
    #[error("Approver lookup unavailable for role {role}: {reason}")]
    ApproverLookupUnavailable {
        /// Role being resolved
        role: String,
        /// Underlying fabric failure
        reason: String,
    },

    /// No allowance-adjustment response arrived within the configured window
    #[error("Allowance adjustment timed out")]
    AllowanceAdjustmentTimeout,

    /// The fabric rejected the allowance-adjustment publish
    #[error("Allowance adjustment unavailable: {reason}")]
    AllowanceAdjustmentUnavailable {
        /// Underlying fabric failure
        reason: String,
    },

    /// Cancel attempted on a request that was already awarded
    #[error("Request {id} has already been awarded and cannot be cancelled")]
    AlreadyFinalized {
        /// The approved request
        id: Uuid,
    },

    /// Compensation publish failed, so the cancellation was aborted
    #[error("Compensation publish failed for request {id}: {reason}")]
    CompensationPublishFailed {
        /// Request whose refund obligation could not be published
        id: Uuid,
        /// Underlying fabric failure
        reason: String,
    },

    /// Operation is not valid from the record's current status
    #[error("Invalid state transition: {operation} is not allowed from {from}")]
    InvalidStateTransition {
        /// Current status of the record
        from: String,
        /// The attempted operation
        operation: String,
    },

    /// A correlation token was registered twice
    #[error("Duplicate correlation token: {0}")]
    DuplicateCorrelationToken(String),

    /// Registry is shutting down and no longer accepts registrations
    #[error("Correlation registry is shut down")]
    RegistryShutDown,

    /// Record or blob store failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Blob key referenced by the record does not exist
    #[error("Attachment not found: {key}")]
    AttachmentNotFound {
        /// The missing blob-store key
        key: String,
    },

    /// Download requested from a slot with no uploaded attachment
    #[error("No {slot} attachment uploaded for request {id}")]
    AttachmentMissing {
        /// The request whose slot is empty
        id: Uuid,
        /// Which slot was asked for
        slot: &'static str,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
