// Copyright 2025 Cowboy AI, LLC.

//! Transition table for the approval state machine
//!
//! Statuses advance monotonically along the graph
//! `Draft → AwaitingSupervisorApproval → AwaitingDepartmentHeadApproval →
//! AwaitingBencoApproval → Pending → Approved`, with `Denied` reachable from
//! any awaiting state and cancellation removing the record from anything not
//! yet Approved.

use crate::errors::{DomainError, DomainResult};
use crate::request::Status;

/// Operations a caller can invoke on the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOperation {
    /// Submit a draft into the approval chain
    Submit,
    /// Supervisor signs off
    SupervisorApprove,
    /// Department head signs off
    DepartmentHeadApprove,
    /// Benefits coordinator signs off
    BencoApprove,
    /// Administrative award after verified completion
    Award,
    /// An approver denies the request
    Deny,
    /// The requester withdraws the request
    Cancel,
}

impl WorkflowOperation {
    /// Operation name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowOperation::Submit => "submit",
            WorkflowOperation::SupervisorApprove => "supervisor-approve",
            WorkflowOperation::DepartmentHeadApprove => "department-head-approve",
            WorkflowOperation::BencoApprove => "benco-approve",
            WorkflowOperation::Award => "award",
            WorkflowOperation::Deny => "deny",
            WorkflowOperation::Cancel => "cancel",
        }
    }

    /// Statuses this operation may be invoked from
    pub fn allowed_from(&self) -> &'static [Status] {
        match self {
            WorkflowOperation::Submit => &[Status::Draft],
            WorkflowOperation::SupervisorApprove => &[Status::AwaitingSupervisorApproval],
            WorkflowOperation::DepartmentHeadApprove => &[Status::AwaitingDepartmentHeadApproval],
            WorkflowOperation::BencoApprove => &[Status::AwaitingBencoApproval],
            WorkflowOperation::Award => &[Status::Pending],
            WorkflowOperation::Deny => &[
                Status::AwaitingSupervisorApproval,
                Status::AwaitingDepartmentHeadApproval,
                Status::AwaitingBencoApproval,
            ],
            WorkflowOperation::Cancel => &[
                Status::Draft,
                Status::AwaitingSupervisorApproval,
                Status::AwaitingDepartmentHeadApproval,
                Status::AwaitingBencoApproval,
                Status::Pending,
                Status::Denied,
            ],
        }
    }
}

/// Check that `operation` is valid from `status`
pub fn ensure_allowed(status: Status, operation: WorkflowOperation) -> DomainResult<()> {
    if operation.allowed_from().contains(&status) {
        Ok(())
    } else {
        Err(DomainError::InvalidStateTransition {
            from: status.name().to_string(),
            operation: operation.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Status::Draft, WorkflowOperation::Submit, true)]
    #[test_case(Status::Pending, WorkflowOperation::Submit, false)]
    #[test_case(Status::AwaitingSupervisorApproval, WorkflowOperation::SupervisorApprove, true)]
    #[test_case(Status::AwaitingBencoApproval, WorkflowOperation::SupervisorApprove, false)]
    #[test_case(Status::AwaitingBencoApproval, WorkflowOperation::BencoApprove, true)]
    #[test_case(Status::Pending, WorkflowOperation::Award, true)]
    #[test_case(Status::Approved, WorkflowOperation::Award, false)]
    #[test_case(Status::AwaitingDepartmentHeadApproval, WorkflowOperation::Deny, true)]
    #[test_case(Status::Draft, WorkflowOperation::Deny, false)]
    #[test_case(Status::Pending, WorkflowOperation::Cancel, true)]
    #[test_case(Status::Approved, WorkflowOperation::Cancel, false)]
    fn transition_table(status: Status, operation: WorkflowOperation, allowed: bool) {
        assert_eq!(ensure_allowed(status, operation).is_ok(), allowed);
    }

    #[test]
    fn no_operation_leaves_approved() {
        for operation in [
            WorkflowOperation::Submit,
            WorkflowOperation::SupervisorApprove,
            WorkflowOperation::DepartmentHeadApprove,
            WorkflowOperation::BencoApprove,
            WorkflowOperation::Award,
            WorkflowOperation::Deny,
            WorkflowOperation::Cancel,
        ] {
            assert!(!operation.allowed_from().contains(&Status::Approved));
        }
    }
}
