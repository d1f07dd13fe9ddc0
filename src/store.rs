// Copyright 2025 Cowboy AI, LLC.

//! Record store seam for reimbursement requests

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::request::{ReimbursementRequest, Status};

/// Keyed record store for reimbursement requests
///
/// `save` upserts by id and never assigns one; ids are chosen at creation
/// time by the aggregate. `delete_by_id` is idempotent.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Load a request, failing with `RequestNotFound` when absent
    async fn find_by_id(&self, id: Uuid) -> DomainResult<ReimbursementRequest>;

    /// All stored requests
    async fn find_all(&self) -> DomainResult<Vec<ReimbursementRequest>>;

    /// Requests for one user filtered by status
    async fn find_by_username_and_status(
        &self,
        username: &str,
        status: Status,
    ) -> DomainResult<Vec<ReimbursementRequest>>;

    /// Upsert a request by its id
    async fn save(&self, request: &ReimbursementRequest) -> DomainResult<()>;

    /// Remove a request; removing an absent id is a no-op
    async fn delete_by_id(&self, id: Uuid) -> DomainResult<()>;
}

/// In-process request store backed by a map
#[derive(Default)]
pub struct InMemoryRequestStore {
    records: RwLock<HashMap<Uuid, ReimbursementRequest>>,
}

impl InMemoryRequestStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<ReimbursementRequest> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DomainError::RequestNotFound { id })
    }

    async fn find_all(&self) -> DomainResult<Vec<ReimbursementRequest>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn find_by_username_and_status(
        &self,
        username: &str,
        status: Status,
    ) -> DomainResult<Vec<ReimbursementRequest>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.username == username && r.status == status)
            .cloned()
            .collect())
    }

    async fn save(&self, request: &ReimbursementRequest) -> DomainResult<()> {
        self.records
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> DomainResult<()> {
        self.records.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{EventType, GradeFormat, RequestDraft};
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn sample_request(username: &str) -> ReimbursementRequest {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        ReimbursementRequest::create(
            RequestDraft {
                username: username.to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: format!("{username}@example.com"),
                date: today + Duration::days(30),
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                urgent: false,
                location: "Online".to_string(),
                description: "Training".to_string(),
                cost_cents: 50_000,
                grade_format: GradeFormat::PassFail,
                passing_grade: "Pass".to_string(),
                event_type: EventType::TechnicalTraining,
                justification: "Upskilling".to_string(),
                hours_missed: 8,
            },
            today,
            7,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let store = InMemoryRequestStore::new();
        let request = sample_request("jdoe");
        store.save(&request).await.unwrap();

        let loaded = store.find_by_id(request.id).await.unwrap();
        assert_eq!(loaded, request);
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let store = InMemoryRequestStore::new();
        assert!(matches!(
            store.find_by_id(Uuid::new_v4()).await,
            Err(DomainError::RequestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryRequestStore::new();
        let request = sample_request("jdoe");
        store.save(&request).await.unwrap();

        store.delete_by_id(request.id).await.unwrap();
        store.delete_by_id(request.id).await.unwrap();
        assert!(store.find_by_id(request.id).await.is_err());
    }

    #[tokio::test]
    async fn filter_by_username_and_status() {
        let store = InMemoryRequestStore::new();
        let a = sample_request("jdoe");
        let mut b = sample_request("jdoe");
        b.status = Status::Pending;
        let c = sample_request("other");
        for request in [&a, &b, &c] {
            store.save(request).await.unwrap();
        }

        let drafts = store
            .find_by_username_and_status("jdoe", Status::Draft)
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, a.id);
    }
}
