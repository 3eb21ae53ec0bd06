//! Workflow mutations against a stateful backend

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use rxtriage_core::Notification;
use rxtriage_types::{
    ActionStatus, CountBucket, MessageId, MessageStatus, MessageType, OperationName, TabId,
};

use crate::common::{Clinic, message};

const SEARCH: &str = "/messages/search";
const COUNT: &str = "/messages/count";

async fn clinic() -> Clinic {
    Clinic::start(vec![
        message(42, MessageType::RxRenewalRequest, MessageStatus::Pending),
        message(43, MessageType::RxChangeRequest, MessageStatus::Pending),
        message(44, MessageType::NewRx, MessageStatus::Error),
    ])
    .await
}

#[tokio::test]
async fn approve_refetches_owning_tab_and_counts() {
    let clinic = clinic().await;
    let store = clinic.store();
    let queue = store.queue();

    store.bootstrap().await;
    assert_eq!(queue.counts().get(CountBucket::RefillRx), 1);
    assert!(queue.page(TabId::Pending).contains(MessageId::new(42)));
    let searches = clinic.requests_to(SEARCH).await.len();
    let counts = clinic.requests_to(COUNT).await.len();

    assert!(queue.approve(MessageId::new(42)).await);

    assert_eq!(clinic.status_of(42), Some(MessageStatus::Success));
    assert_eq!(clinic.requests_to(SEARCH).await.len(), searches + 1);
    assert_eq!(
        clinic.requests_to(COUNT).await.len(),
        counts + CountBucket::ALL.len()
    );

    let pending = queue.page(TabId::Pending);
    assert!(!pending.contains(MessageId::new(42)));
    assert_eq!(pending.total, 1);
    let badges = queue.counts();
    assert_eq!(badges.get(CountBucket::RefillRx), 0);
    assert_eq!(badges.get(CountBucket::Approved), 1);

    assert_eq!(queue.status(&OperationName::APPROVE), ActionStatus::Fulfilled);
    assert_eq!(
        store.take_notifications(),
        vec![Notification::MutationApplied {
            operation: "approve".to_string()
        }]
    );
}

#[tokio::test]
async fn rejected_approve_keeps_list_and_skips_refetch() {
    let clinic = clinic().await;
    Mock::given(method("POST"))
        .and(path("/messages/42/approve"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "locked" })))
        .with_priority(1)
        .mount(&clinic.server)
        .await;
    let store = clinic.store();
    let queue = store.queue();

    store.bootstrap().await;
    let before = queue.page(TabId::Pending);
    let counts_before = queue.counts();
    let searches = clinic.requests_to(SEARCH).await.len();
    let counts = clinic.requests_to(COUNT).await.len();

    assert!(!queue.approve(MessageId::new(42)).await);

    assert_eq!(queue.status(&OperationName::APPROVE), ActionStatus::Rejected);
    assert_eq!(queue.error(&OperationName::APPROVE).as_deref(), Some("locked"));
    assert_eq!(queue.page(TabId::Pending), before);
    assert_eq!(queue.counts(), counts_before);
    assert_eq!(clinic.requests_to(SEARCH).await.len(), searches);
    assert_eq!(clinic.requests_to(COUNT).await.len(), counts);
    assert_eq!(clinic.status_of(42), Some(MessageStatus::Pending));
    assert_eq!(clinic.requests_to("/messages/42/approve").await.len(), 1);

    let notes = store.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].format(), "approve failed: locked");
}

#[tokio::test]
async fn deny_moves_message_to_declined() {
    let clinic = clinic().await;
    let store = clinic.store();
    let queue = store.queue();
    store.bootstrap().await;

    assert!(queue.deny(MessageId::new(43)).await);

    assert!(!queue.page(TabId::Pending).contains(MessageId::new(43)));
    assert_eq!(queue.counts().get(CountBucket::ChangeRx), 0);
    assert_eq!(queue.counts().get(CountBucket::Declined), 1);
}

#[tokio::test]
async fn delete_of_unknown_message_reports_backend_message() {
    let clinic = clinic().await;
    Mock::given(method("DELETE"))
        .and(path("/messages/99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": { "message": "no such message" } })),
        )
        .with_priority(1)
        .mount(&clinic.server)
        .await;
    let store = clinic.store();

    assert!(!store.queue().delete(MessageId::new(99)).await);
    assert_eq!(
        store.queue().error(&OperationName::DELETE).as_deref(),
        Some("no such message")
    );
}

#[tokio::test]
async fn delete_drops_message_from_loaded_lists() {
    let clinic = clinic().await;
    let store = clinic.store();
    let queue = store.queue();
    store.bootstrap().await;
    queue.select_tab(TabId::Error).await;
    assert!(queue.page(TabId::Error).contains(MessageId::new(44)));

    assert!(queue.delete(MessageId::new(44)).await);

    assert!(!queue.page(TabId::Error).contains(MessageId::new(44)));
    assert_eq!(queue.counts().get(CountBucket::Error), 0);
    assert_eq!(clinic.status_of(44), None);
}
