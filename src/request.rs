// Copyright 2025 Cowboy AI, LLC.

//! The reimbursement request aggregate and its enumerated classifications
//!
//! A request is created by the employee, edited pre-submission through a
//! restricted update, and thereafter mutated exclusively by workflow
//! transitions. Monetary amounts are integer cents so they can never go
//! negative.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

/// Workflow status of a reimbursement request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Created, not yet submitted for approval
    Draft,
    /// Waiting on the requester's direct supervisor
    AwaitingSupervisorApproval,
    /// Waiting on the department head
    AwaitingDepartmentHeadApproval,
    /// Waiting on the benefits coordinator
    AwaitingBencoApproval,
    /// Fully approved, funds held until the event completes
    Pending,
    /// Awarded after verified completion of the event
    Approved,
    /// Denied by an approver
    Denied,
}

impl Status {
    /// All statuses, in workflow order
    pub fn all() -> &'static [Status] {
        &[
            Status::Draft,
            Status::AwaitingSupervisorApproval,
            Status::AwaitingDepartmentHeadApproval,
            Status::AwaitingBencoApproval,
            Status::Pending,
            Status::Approved,
            Status::Denied,
        ]
    }

    /// Whether this status is one of the awaiting-approval states
    pub fn is_awaiting(&self) -> bool {
        matches!(
            self,
            Status::AwaitingSupervisorApproval
                | Status::AwaitingDepartmentHeadApproval
                | Status::AwaitingBencoApproval
        )
    }

    /// Whether the workflow can make no further progress from here
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Denied)
    }

    /// Name of this status for logging and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::AwaitingSupervisorApproval => "AwaitingSupervisorApproval",
            Status::AwaitingDepartmentHeadApproval => "AwaitingDepartmentHeadApproval",
            Status::AwaitingBencoApproval => "AwaitingBencoApproval",
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Denied => "Denied",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classification of the event being reimbursed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// University course for credit
    UniversityCourse,
    /// Seminar attendance
    Seminar,
    /// Certification exam
    Certification,
    /// Preparation class for a certification
    CertificationPrepClass,
    /// Technical training
    TechnicalTraining,
    /// Anything else
    Other,
}

impl EventType {
    /// All event types
    pub fn all() -> &'static [EventType] {
        &[
            EventType::UniversityCourse,
            EventType::Seminar,
            EventType::Certification,
            EventType::CertificationPrepClass,
            EventType::TechnicalTraining,
            EventType::Other,
        ]
    }
}

/// How completion of the event is graded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeFormat {
    /// Letter grade (A-F)
    Letter,
    /// Numeric percentage
    Percentage,
    /// Pass or fail
    PassFail,
    /// Graded by a presentation to the department
    Presentation,
}

impl GradeFormat {
    /// All grade formats
    pub fn all() -> &'static [GradeFormat] {
        &[
            GradeFormat::Letter,
            GradeFormat::Percentage,
            GradeFormat::PassFail,
            GradeFormat::Presentation,
        ]
    }
}

/// User-supplied fields for creating a new request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDraft {
    /// Requester's username
    pub username: String,
    /// Requester's first name
    pub first_name: String,
    /// Requester's last name
    pub last_name: String,
    /// Requester's email
    pub email: String,
    /// Date of the event
    pub date: NaiveDate,
    /// Start time of the event
    pub time: NaiveTime,
    /// Whether the request needs expedited handling
    pub urgent: bool,
    /// Where the event takes place
    pub location: String,
    /// What the event is
    pub description: String,
    /// Cost of the event, in cents
    pub cost_cents: u64,
    /// How completion is graded
    pub grade_format: GradeFormat,
    /// Minimum grade counted as passing
    pub passing_grade: String,
    /// Classification of the event
    pub event_type: EventType,
    /// Why the event benefits the company
    pub justification: String,
    /// Work hours missed to attend
    pub hours_missed: u32,
}

/// User-editable fields accepted by the restricted update operation
///
/// Workflow-owned fields (status, reason denied, reimbursement) and
/// attachment keys are deliberately absent. Updates overwrite only what is
/// listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestUpdate {
    /// Requester's first name
    pub first_name: String,
    /// Requester's last name
    pub last_name: String,
    /// Requester's email
    pub email: String,
    /// Date of the event
    pub date: NaiveDate,
    /// Start time of the event
    pub time: NaiveTime,
    /// Whether the request needs expedited handling
    pub urgent: bool,
    /// Where the event takes place
    pub location: String,
    /// What the event is
    pub description: String,
    /// Cost of the event, in cents
    pub cost_cents: u64,
    /// How completion is graded
    pub grade_format: GradeFormat,
    /// Minimum grade counted as passing
    pub passing_grade: String,
    /// Classification of the event
    pub event_type: EventType,
    /// Why the event benefits the company
    pub justification: String,
    /// Work hours missed to attend
    pub hours_missed: u32,
}

/// A reimbursement request record, the aggregate driven by the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReimbursementRequest {
    /// Globally unique request id, assigned at creation
    pub id: Uuid,
    /// Requester's username
    pub username: String,
    /// Requester's first name
    pub first_name: String,
    /// Requester's last name
    pub last_name: String,
    /// Requester's email
    pub email: String,
    /// Date of the event
    pub date: NaiveDate,
    /// Start time of the event
    pub time: NaiveTime,
    /// Whether the request needs expedited handling
    pub urgent: bool,
    /// Where the event takes place
    pub location: String,
    /// What the event is
    pub description: String,
    /// Cost of the event, in cents
    pub cost_cents: u64,
    /// How completion is graded
    pub grade_format: GradeFormat,
    /// Minimum grade counted as passing
    pub passing_grade: String,
    /// Classification of the event
    pub event_type: EventType,
    /// Why the event benefits the company
    pub justification: String,
    /// Work hours missed to attend
    pub hours_missed: u32,
    /// Blob-store key of the event attachment, if uploaded
    pub attachment: Option<String>,
    /// Blob-store key of the supervisor pre-approval, if uploaded
    pub supervisor_attachment: Option<String>,
    /// Blob-store key of the department-head pre-approval, if uploaded
    pub department_head_attachment: Option<String>,
    /// Current workflow status
    pub status: Status,
    /// Reason given by a denying approver; set iff status is Denied
    pub reason_denied: Option<String>,
    /// Whether funds beyond the yearly allowance were approved
    pub excess_funds_approved: bool,
    /// Amount to reimburse, in cents; may be reduced at benco approval
    pub reimbursement_cents: u64,
}

impl ReimbursementRequest {
    /// Create a new request from a draft, enforcing the lead-time rule.
    ///
    /// The event date must be at least `minimum_notice_days` after `today`,
    /// otherwise creation fails with `InsufficientNotice`.
    pub fn create(
        draft: RequestDraft,
        today: NaiveDate,
        minimum_notice_days: u32,
    ) -> DomainResult<Self> {
        let days_given = (draft.date - today).num_days();
        if days_given < i64::from(minimum_notice_days) {
            return Err(DomainError::InsufficientNotice {
                days_required: minimum_notice_days,
                days_given,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            username: draft.username,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            date: draft.date,
            time: draft.time,
            urgent: draft.urgent,
            location: draft.location,
            description: draft.description,
            cost_cents: draft.cost_cents,
            grade_format: draft.grade_format,
            passing_grade: draft.passing_grade,
            event_type: draft.event_type,
            justification: draft.justification,
            hours_missed: draft.hours_missed,
            attachment: None,
            supervisor_attachment: None,
            department_head_attachment: None,
            status: Status::Draft,
            reason_denied: None,
            excess_funds_approved: false,
            reimbursement_cents: draft.cost_cents,
        })
    }

    /// Overwrite the user-editable fields only.
    ///
    /// Status, denial reason, reimbursement amount, the excess-funds flag
    /// and all attachment keys are untouched regardless of what the caller
    /// supplies.
    pub fn apply_update(&mut self, update: RequestUpdate) {
        self.first_name = update.first_name;
        self.last_name = update.last_name;
        self.email = update.email;
        self.date = update.date;
        self.time = update.time;
        self.urgent = update.urgent;
        self.location = update.location;
        self.description = update.description;
        self.cost_cents = update.cost_cents;
        self.grade_format = update.grade_format;
        self.passing_grade = update.passing_grade;
        self.event_type = update.event_type;
        self.justification = update.justification;
        self.hours_missed = update.hours_missed;
    }
}
