// Copyright 2025 Cowboy AI, LLC.

//! Blob store seam and attachment content-type policy

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};

/// Content types accepted for the event attachment
const EVENT_ATTACHMENT_TYPES: [&str; 6] = [
    "application/pdf",
    "image/png",
    "image/jpg",
    "image/jpeg",
    "text/plain",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// The one content type accepted for pre-approval attachments (a forwarded
/// mail message)
const PRE_APPROVAL_TYPE: &str = "application/vnd.ms-outlook";

/// Which slot on the request an attachment is destined for
///
/// Each kind carries its own content-type allow-list; anything not listed
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Receipt or flyer for the event itself
    Event,
    /// Out-of-band approval evidence from a supervisor or department head
    PreApproval,
}

impl AttachmentKind {
    /// Validate a content type against this kind's allow-list
    pub fn validate(&self, content_type: &str) -> DomainResult<()> {
        let accepted = match self {
            AttachmentKind::Event => EVENT_ATTACHMENT_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(content_type)),
            AttachmentKind::PreApproval => PRE_APPROVAL_TYPE.eq_ignore_ascii_case(content_type),
        };
        if accepted {
            Ok(())
        } else {
            Err(DomainError::UnsupportedAttachmentType {
                content_type: content_type.to_string(),
            })
        }
    }
}

/// A stored blob with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    /// MIME type the blob was stored with
    pub content_type: String,
    /// The bytes
    pub bytes: Bytes,
}

/// External binary attachment storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob and return its key
    async fn put(&self, content_type: &str, bytes: Bytes) -> DomainResult<String>;

    /// Fetch a blob by key
    async fn get(&self, key: &str) -> DomainResult<BlobObject>;
}

/// In-process blob store for tests and local runs
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, BlobObject>>,
}

impl InMemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, content_type: &str, bytes: Bytes) -> DomainResult<String> {
        let key = Uuid::new_v4().to_string();
        self.blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                key.clone(),
                BlobObject {
                    content_type: content_type.to_string(),
                    bytes,
                },
            );
        Ok(key)
    }

    async fn get(&self, key: &str) -> DomainResult<BlobObject> {
        self.blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::AttachmentNotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("application/pdf", true; "pdf accepted")]
    #[test_case("image/png", true; "png accepted")]
    #[test_case("image/jpeg", true; "jpeg accepted")]
    #[test_case("text/plain", true; "plain text accepted")]
    #[test_case("image/gif", false; "gif rejected")]
    #[test_case("application/vnd.ms-outlook", false; "mail message rejected for event slot")]
    fn event_attachment_policy(content_type: &str, accepted: bool) {
        assert_eq!(
            AttachmentKind::Event.validate(content_type).is_ok(),
            accepted
        );
    }

    #[test_case("application/vnd.ms-outlook", true; "mail message accepted")]
    #[test_case("application/pdf", false; "pdf rejected for pre-approval slot")]
    fn pre_approval_policy(content_type: &str, accepted: bool) {
        assert_eq!(
            AttachmentKind::PreApproval.validate(content_type).is_ok(),
            accepted
        );
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryBlobStore::new();
        let key = store
            .put("application/pdf", Bytes::from_static(b"%PDF-"))
            .await
            .unwrap();

        let blob = store.get(&key).await.unwrap();
        assert_eq!(blob.content_type, "application/pdf");
        assert_eq!(blob.bytes, Bytes::from_static(b"%PDF-"));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            store.get("nope").await,
            Err(DomainError::AttachmentNotFound { .. })
        ));
    }
}
