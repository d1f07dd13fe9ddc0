// Copyright 2025 Cowboy AI, LLC.

//! Approval workflow engine and its transition table

mod engine;
mod transitions;

pub use engine::{ApprovalWorkflow, AttachmentSlot};
pub use transitions::{ensure_allowed, WorkflowOperation};
