// Copyright 2025 Cowboy AI, LLC.

//! # Reimbursement Domain
//!
//! Core of an employee reimbursement system: a multi-party approval chain
//! (supervisor → department head → benefits coordinator) driven over an
//! asynchronous message fabric.
//!
//! The two load-bearing pieces are:
//! - **Correlation**: outbound queue publishes become awaitable calls by
//!   matching inbound responses to pending callers via a correlation token
//!   ([`correlation::CorrelationRegistry`]).
//! - **Workflow**: a state machine that advances a request through its
//!   statuses, skips approval steps that are already evidenced, and issues
//!   a compensating publish when a funded request is cancelled
//!   ([`workflow::ApprovalWorkflow`]).
//!
//! The persistent record store, blob storage, and the remote party that
//! answers approver lookups and allowance adjustments are external
//! collaborators behind seams ([`store::RequestStore`],
//! [`attachments::BlobStore`], and the fabric channels in [`fabric`]).

#![warn(missing_docs)]

pub mod attachments;
pub mod config;
pub mod correlation;
pub mod errors;
pub mod fabric;
pub mod lookup;
pub mod notify;
pub mod request;
pub mod store;
pub mod workflow;

pub use attachments::{AttachmentKind, BlobObject, BlobStore, InMemoryBlobStore};
pub use config::{DomainConfig, FabricConfig, WorkflowConfig};
pub use correlation::{CorrelationRegistry, CorrelationToken, PendingReply, ReplyError};
pub use errors::{DomainError, DomainResult};
pub use fabric::{channels, FabricError, InMemoryFabric, MessageFabric, NatsFabric};
pub use lookup::{AllowanceMessage, ApproverIdentity, ApproverRole, RemoteDirectory};
pub use notify::{CompensationMessage, InboxMessage, NotificationPublisher};
pub use request::{
    EventType, GradeFormat, ReimbursementRequest, RequestDraft, RequestUpdate, Status,
};
pub use store::{InMemoryRequestStore, RequestStore};
pub use workflow::{ApprovalWorkflow, AttachmentSlot, WorkflowOperation};
