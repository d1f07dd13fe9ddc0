// Copyright 2025 Cowboy AI, LLC.

//! The approval workflow engine
//!
//! Owns the state machine driving a request through the supervisor →
//! department head → benco chain, the skip rules for pre-supplied
//! approvals, and the compensating publish on cancellation of a Pending
//! request. Records are persisted only after every required remote result
//! is in hand, so a failed lookup leaves the prior status untouched and the
//! operation retryable.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::attachments::{AttachmentKind, BlobObject, BlobStore};
use crate::config::WorkflowConfig;
use crate::errors::{DomainError, DomainResult};
use crate::lookup::{ApproverRole, RemoteDirectory};
use crate::notify::NotificationPublisher;
use crate::request::{
    EventType, GradeFormat, ReimbursementRequest, RequestDraft, RequestUpdate, Status,
};
use crate::store::RequestStore;
use crate::workflow::transitions::{ensure_allowed, WorkflowOperation};

/// Which attachment slot an upload or download targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSlot {
    /// The event receipt or flyer
    Event,
    /// Supervisor pre-approval evidence
    Supervisor,
    /// Department head pre-approval evidence
    DepartmentHead,
}

impl AttachmentSlot {
    fn kind(&self) -> AttachmentKind {
        match self {
            AttachmentSlot::Event => AttachmentKind::Event,
            AttachmentSlot::Supervisor | AttachmentSlot::DepartmentHead => {
                AttachmentKind::PreApproval
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AttachmentSlot::Event => "event",
            AttachmentSlot::Supervisor => "supervisor",
            AttachmentSlot::DepartmentHead => "department-head",
        }
    }

    fn key_of(&self, request: &ReimbursementRequest) -> Option<String> {
        match self {
            AttachmentSlot::Event => request.attachment.clone(),
            AttachmentSlot::Supervisor => request.supervisor_attachment.clone(),
            AttachmentSlot::DepartmentHead => request.department_head_attachment.clone(),
        }
    }

    fn set_key(&self, request: &mut ReimbursementRequest, key: String) {
        match self {
            AttachmentSlot::Event => request.attachment = Some(key),
            AttachmentSlot::Supervisor => request.supervisor_attachment = Some(key),
            AttachmentSlot::DepartmentHead => request.department_head_attachment = Some(key),
        }
    }
}

/// Serializes transitions per request id so at most one is in flight
#[derive(Default)]
struct RequestLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl RequestLocks {
    async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // An entry whose only owner is the map has no guard held and no
            // waiter queued, so it can go. Removing an entry that is still
            // in use would hand a second caller a fresh mutex and break the
            // one-transition-per-id guarantee.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// The approval workflow service
pub struct ApprovalWorkflow {
    store: Arc<dyn RequestStore>,
    blobs: Arc<dyn BlobStore>,
    directory: RemoteDirectory,
    notifications: NotificationPublisher,
    config: WorkflowConfig,
    locks: RequestLocks,
}

impl ApprovalWorkflow {
    /// Assemble the engine from its collaborators
    pub fn new(
        store: Arc<dyn RequestStore>,
        blobs: Arc<dyn BlobStore>,
        directory: RemoteDirectory,
        notifications: NotificationPublisher,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            directory,
            notifications,
            config,
            locks: RequestLocks::default(),
        }
    }

    /// Create a new request from a draft, enforcing the lead-time rule
    pub async fn create(&self, draft: RequestDraft) -> DomainResult<ReimbursementRequest> {
        let request =
            ReimbursementRequest::create(draft, Utc::now().date_naive(), self.config.minimum_notice_days)?;
        self.store.save(&request).await?;
        info!(id = %request.id, username = %request.username, "created reimbursement request");
        Ok(request)
    }

    /// Load a request by id
    pub async fn find(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        self.store.find_by_id(id).await
    }

    /// All requests
    pub async fn find_all(&self) -> DomainResult<Vec<ReimbursementRequest>> {
        self.store.find_all().await
    }

    /// One user's requests in a given status
    pub async fn find_by_username_and_status(
        &self,
        username: &str,
        status: Status,
    ) -> DomainResult<Vec<ReimbursementRequest>> {
        self.store.find_by_username_and_status(username, status).await
    }

    /// Overwrite the user-editable fields of a request
    pub async fn update(&self, id: Uuid, update: RequestUpdate) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        request.apply_update(update);
        self.store.save(&request).await?;
        Ok(request)
    }

    /// Remove a request without workflow side effects (pre-submission
    /// housekeeping; cancellation of an in-flight request goes through
    /// [`cancel`](Self::cancel))
    pub async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let _guard = self.locks.acquire(id).await;
        self.store.delete_by_id(id).await
    }

    /// All event classifications
    pub fn event_types(&self) -> &'static [EventType] {
        EventType::all()
    }

    /// All grading formats
    pub fn grade_formats(&self) -> &'static [GradeFormat] {
        GradeFormat::all()
    }

    /// All workflow statuses
    pub fn statuses(&self) -> &'static [Status] {
        Status::all()
    }

    /// Validate and store an attachment, recording its blob key on the
    /// request. The key, once set, is never cleared; a re-upload replaces it.
    pub async fn upload_attachment(
        &self,
        id: Uuid,
        slot: AttachmentSlot,
        content_type: &str,
        bytes: Bytes,
    ) -> DomainResult<ReimbursementRequest> {
        slot.kind().validate(content_type)?;

        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        let key = self.blobs.put(content_type, bytes).await?;
        slot.set_key(&mut request, key);
        self.store.save(&request).await?;
        Ok(request)
    }

    /// Fetch the blob behind an attachment slot
    pub async fn download_attachment(
        &self,
        id: Uuid,
        slot: AttachmentSlot,
    ) -> DomainResult<BlobObject> {
        let request = self.store.find_by_id(id).await?;
        let key = slot
            .key_of(&request)
            .ok_or(DomainError::AttachmentMissing {
                id,
                slot: slot.name(),
            })?;
        self.blobs.get(&key).await
    }

    /// Submit a draft into the approval chain.
    ///
    /// A supervisor pre-approval attachment on the record skips the
    /// supervisor step outright, lookup included. Otherwise the requester's
    /// supervisor is resolved; one who is themselves a department head is
    /// skipped the same way. In the remaining case the supervisor is
    /// notified and the record waits on them.
    #[instrument(skip(self))]
    pub async fn submit_for_approval(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::Submit)?;

        // Pre-approval evidence makes the supervisor lookup itself
        // unnecessary; the dual-role skip can only be decided after it.
        if request.supervisor_attachment.is_some() {
            self.supervisor_approve_effect(&mut request).await?;
        } else {
            let supervisor = self
                .directory
                .resolve_approver(&request.username, ApproverRole::Supervisor)
                .await?;
            if supervisor.is_department_head() {
                self.supervisor_approve_effect(&mut request).await?;
            } else {
                self.notifications.notify(id, &supervisor.username).await;
                request.status = Status::AwaitingSupervisorApproval;
            }
        }

        self.store.save(&request).await?;
        info!(%id, status = %request.status, "submitted for approval");
        Ok(request)
    }

    /// Supervisor signs off on the request
    #[instrument(skip(self))]
    pub async fn supervisor_approve(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::SupervisorApprove)?;

        self.supervisor_approve_effect(&mut request).await?;
        self.store.save(&request).await?;
        info!(%id, status = %request.status, "supervisor approved");
        Ok(request)
    }

    /// Department head signs off on the request
    #[instrument(skip(self))]
    pub async fn department_head_approve(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::DepartmentHeadApprove)?;

        self.department_head_approve_effect(&mut request).await?;
        self.store.save(&request).await?;
        info!(%id, status = %request.status, "department head approved");
        Ok(request)
    }

    /// Benefits coordinator signs off; the allowance adjustment may reduce
    /// the reimbursement amount before the record goes Pending
    #[instrument(skip(self))]
    pub async fn benco_approve(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::BencoApprove)?;

        self.notifications.notify(id, &request.username).await;
        let adjusted = self
            .directory
            .adjust_allowance(&request.username, request.reimbursement_cents)
            .await?;

        request.reimbursement_cents = adjusted;
        request.status = Status::Pending;
        self.store.save(&request).await?;
        info!(%id, adjusted, "benco approved");
        Ok(request)
    }

    /// Award the reimbursement after verified completion of the event
    #[instrument(skip(self))]
    pub async fn award(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::Award)?;

        request.status = Status::Approved;
        self.notifications.notify(id, &request.username).await;
        self.store.save(&request).await?;
        info!(%id, "reimbursement awarded");
        Ok(request)
    }

    /// Deny the request from any awaiting state, recording the reason
    #[instrument(skip(self))]
    pub async fn deny(&self, id: Uuid, reason: &str) -> DomainResult<ReimbursementRequest> {
        let _guard = self.locks.acquire(id).await;
        let mut request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::Deny)?;

        request.status = Status::Denied;
        request.reason_denied = Some(reason.to_string());
        self.notifications.notify(id, &request.username).await;
        self.store.save(&request).await?;
        info!(%id, reason, "request denied");
        Ok(request)
    }

    /// Cancel a request.
    ///
    /// An Approved request cannot be cancelled. A Pending request has funds
    /// held against the user's allowance, so the compensation message must
    /// be accepted by the fabric before the record is deleted; when that
    /// publish fails the record is retained and the caller can retry. Any
    /// other status is deleted outright.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> DomainResult<()> {
        let _guard = self.locks.acquire(id).await;
        let request = self.store.find_by_id(id).await?;
        ensure_allowed(request.status, WorkflowOperation::Cancel).map_err(|_| {
            DomainError::AlreadyFinalized { id }
        })?;

        if request.status == Status::Pending {
            self.notifications
                .notify_cancellation(id, &request.username, request.reimbursement_cents)
                .await
                .map_err(|e| DomainError::CompensationPublishFailed {
                    id,
                    reason: e.to_string(),
                })?;
            info!(%id, amount = request.reimbursement_cents, "compensation published");
        }

        self.store.delete_by_id(id).await?;
        info!(%id, "request cancelled");
        Ok(())
    }

    /// Supervisor approval effect, shared by the explicit transition and
    /// the submit-time skip. Skips ahead again when department-head
    /// pre-approval evidence is already attached.
    async fn supervisor_approve_effect(
        &self,
        request: &mut ReimbursementRequest,
    ) -> DomainResult<()> {
        if request.department_head_attachment.is_some() {
            return self.department_head_approve_effect(request).await;
        }

        let department_head = self
            .directory
            .resolve_approver(&request.username, ApproverRole::DepartmentHead)
            .await?;
        self.notifications
            .notify(request.id, &department_head.username)
            .await;
        request.status = Status::AwaitingDepartmentHeadApproval;
        Ok(())
    }

    /// Department-head approval effect, shared by the explicit transition
    /// and the skip paths
    async fn department_head_approve_effect(
        &self,
        request: &mut ReimbursementRequest,
    ) -> DomainResult<()> {
        let benco = self
            .directory
            .resolve_approver(&request.username, ApproverRole::Benco)
            .await?;
        self.notifications.notify(request.id, &benco.username).await;
        request.status = Status::AwaitingBencoApproval;
        Ok(())
    }
}
