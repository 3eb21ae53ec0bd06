//! Tab lists, filters and badge counts over HTTP

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use rxtriage_types::{
    ActionStatus, CountBucket, FilterFamily, MessageId, MessageStatus, MessageType,
    OperationName, TabId,
};

use crate::common::{Clinic, message};

#[tokio::test]
async fn time_frame_sets_from_date_and_fetches_with_it() {
    let clinic = Clinic::start(vec![message(
        1,
        MessageType::RxRenewalRequest,
        MessageStatus::Pending,
    )])
    .await;
    let store = clinic.store();
    let queue = store.queue();

    let outcome = queue.set_time_frame(TabId::Pending, 5).await.unwrap();
    assert!(outcome.is_fulfilled());
    assert_eq!(
        queue.filter(FilterFamily::Pending).from_date.to_string(),
        "2026-10-14"
    );

    let searches = clinic.requests_to("/messages/search").await;
    let body: Value = searches.last().unwrap().body_json().unwrap();
    assert_eq!(body["fromDate"], json!("2026-10-14"));
    assert_eq!(body["toDate"], json!("2026-10-19"));
    assert_eq!(body["messageStatus"], json!("Pending"));
    assert_eq!(body["messageType"], json!("%"));
    assert_eq!(body["offset"], json!(0));
}

#[tokio::test]
async fn unsupported_time_frame_fetches_nothing() {
    let clinic = Clinic::start(Vec::new()).await;
    let store = clinic.store();

    assert!(store.queue().set_time_frame(TabId::Pending, 7).await.is_err());
    assert!(clinic.requests_to("/messages/search").await.is_empty());
}

#[tokio::test]
async fn count_refresh_leaves_lists_alone() {
    let clinic = Clinic::start(vec![message(
        1,
        MessageType::RxChangeRequest,
        MessageStatus::Pending,
    )])
    .await;
    let store = clinic.store();
    let queue = store.queue();
    store.bootstrap().await;
    let page = queue.page(TabId::Pending);

    clinic.insert(message(2, MessageType::RxChangeRequest, MessageStatus::Pending));
    let counts = queue.refresh_counts().await;

    assert_eq!(counts.get(CountBucket::ChangeRx), 2);
    assert_eq!(queue.counts().get(CountBucket::ChangeRx), 2);
    assert_eq!(queue.page(TabId::Pending), page);
    assert!(!queue.page(TabId::Pending).contains(MessageId::new(2)));
}

#[tokio::test]
async fn tab_fetch_leaves_counts_alone() {
    let clinic = Clinic::start(vec![message(
        1,
        MessageType::CancelRx,
        MessageStatus::Pending,
    )])
    .await;
    let store = clinic.store();
    let queue = store.queue();
    store.bootstrap().await;
    let counts = queue.counts();
    let count_requests = clinic.requests_to("/messages/count").await.len();

    clinic.insert(message(2, MessageType::CancelRx, MessageStatus::Pending));
    queue.select_tab(TabId::Cancel).await;

    assert_eq!(queue.page(TabId::Cancel).total, 2);
    assert_eq!(queue.counts(), counts);
    assert_eq!(clinic.requests_to("/messages/count").await.len(), count_requests);
}

#[tokio::test]
async fn failed_fetch_rejects_and_restores_last_page() {
    let clinic = Clinic::start(vec![message(
        1,
        MessageType::RxRenewalRequest,
        MessageStatus::Pending,
    )])
    .await;
    let store = clinic.store();
    let queue = store.queue();
    store.bootstrap().await;
    let page = queue.page(TabId::Pending);
    assert_eq!(page.total, 1);

    Mock::given(method("POST"))
        .and(path("/messages/search"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "maintenance window" })),
        )
        .with_priority(1)
        .mount(&clinic.server)
        .await;

    let outcome = queue.select_tab(TabId::Pending).await;

    assert!(outcome.is_rejected());
    let op = OperationName::fetch(TabId::Pending);
    assert_eq!(queue.status(&op), ActionStatus::Rejected);
    assert_eq!(queue.error(&op).as_deref(), Some("maintenance window"));
    assert_eq!(queue.page(TabId::Pending), page);
    assert!(store.take_notifications().is_empty());
}
