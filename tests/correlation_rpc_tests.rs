// Copyright 2025 Cowboy AI, LLC.

//! Tests of the RPC-over-messaging layer: pending calls resolve
//! independently, out of order, and without starving one another

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use reimbursement_domain::{
    channels, AllowanceMessage, ApproverIdentity, ApproverRole, CorrelationRegistry,
    DomainError, InMemoryFabric, RemoteDirectory, WorkflowConfig,
};

fn directory(
    fabric: Arc<InMemoryFabric>,
    registry: CorrelationRegistry,
    timeout_secs: u64,
) -> RemoteDirectory {
    RemoteDirectory::new(
        fabric,
        registry,
        WorkflowConfig {
            lookup_timeout_secs: timeout_secs,
            adjustment_timeout_secs: timeout_secs,
            ..Default::default()
        },
    )
}

fn approver_payload(username: &str, role: &str) -> Bytes {
    let approver = ApproverIdentity {
        username: username.to_string(),
        role: role.to_string(),
    };
    Bytes::from(serde_json::to_vec(&approver).unwrap())
}

#[tokio::test]
async fn responses_complete_out_of_order() {
    let registry = CorrelationRegistry::new();
    let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
    let directory = directory(fabric.clone(), registry.clone(), 5);

    let first = tokio::spawn({
        let directory = directory.clone();
        async move { directory.resolve_approver("alice", ApproverRole::Supervisor).await }
    });
    let second = tokio::spawn({
        let directory = directory.clone();
        async move { directory.resolve_approver("bob", ApproverRole::Supervisor).await }
    });

    // Wait until both requests are on the wire.
    let published = loop {
        let published = fabric.published_to(channels::SUPERVISOR_LOOKUP);
        if published.len() == 2 {
            break published;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    // Answer the second call first.
    for message in published.iter().rev() {
        let username: String = serde_json::from_slice(&message.payload).unwrap();
        let token = message.token.clone().unwrap();
        registry.complete(&token, approver_payload(&format!("boss-of-{username}"), "SUPERVISOR"));
    }

    let alice = first.await.unwrap().unwrap();
    let bob = second.await.unwrap().unwrap();
    assert_eq!(alice.username, "boss-of-alice");
    assert_eq!(bob.username, "boss-of-bob");
}

#[tokio::test]
async fn a_stalled_call_does_not_starve_others() {
    let registry = CorrelationRegistry::new();
    let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
    let directory = directory(fabric.clone(), registry.clone(), 1);

    let stalled = tokio::spawn({
        let directory = directory.clone();
        async move { directory.resolve_approver("alice", ApproverRole::Benco).await }
    });

    // While the first call is pending with no answer, a second one
    // completes normally.
    let answered = tokio::spawn({
        let directory = directory.clone();
        async move { directory.adjust_allowance("bob", 10_000).await }
    });

    let adjustment = loop {
        let published = fabric.published_to(channels::ALLOWANCE_ADJUSTMENT_REQUEST);
        if let Some(message) = published.first() {
            break message.clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    let reply = AllowanceMessage {
        username: "bob".to_string(),
        amount_cents: 4_000,
    };
    registry.complete(
        &adjustment.token.unwrap(),
        Bytes::from(serde_json::to_vec(&reply).unwrap()),
    );

    assert_eq!(answered.await.unwrap().unwrap(), 4_000);
    assert!(matches!(
        stalled.await.unwrap(),
        Err(DomainError::ApproverLookupTimeout { .. })
    ));
    assert_eq!(registry.pending(), 0);
}

#[tokio::test]
async fn duplicate_delivery_is_harmless() {
    let registry = CorrelationRegistry::new();
    let fabric = Arc::new(InMemoryFabric::new(registry.clone()));
    let directory = directory(fabric.clone(), registry.clone(), 5);

    let call = tokio::spawn({
        let directory = directory.clone();
        async move { directory.resolve_approver("alice", ApproverRole::DepartmentHead).await }
    });

    let message = loop {
        let published = fabric.published_to(channels::DEPARTMENT_HEAD_LOOKUP);
        if let Some(message) = published.first() {
            break message.clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    // The broker redelivers the response; the single-use entry absorbs it.
    let token = message.token.unwrap();
    assert!(registry.complete(&token, approver_payload("head", "DEPARTMENT_HEAD")));
    assert!(!registry.complete(&token, approver_payload("impostor", "DEPARTMENT_HEAD")));

    let resolved = call.await.unwrap().unwrap();
    assert_eq!(resolved.username, "head");
}
