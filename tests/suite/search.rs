//! Debounced lookups over HTTP

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rxtriage_client::{LookupResource, LookupSource};
use rxtriage_engine::{ActionTracker, SearchController, SearchPhase, SearchSettings};
use rxtriage_types::ActionStatus;

use crate::common::{lookup_backend, start_lookup_mock};

fn controller(
    server: &MockServer,
    wait: Duration,
    timeout: Duration,
) -> SearchController<LookupSource> {
    SearchController::new(
        "patients",
        LookupSource::new(lookup_backend(server), LookupResource::Patients),
        SearchSettings {
            wait,
            min_chars: 2,
            timeout,
        },
        ActionTracker::new(),
    )
}

async fn mount_patients(server: &MockServer, query: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/patients/search"))
        .and(query_param("q", query))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": [{ "name": query }] }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

async fn queries(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "q")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

#[tokio::test]
async fn keystrokes_inside_window_send_one_request() {
    let server = start_lookup_mock().await;
    mount_patients(&server, "amix", Duration::ZERO).await;
    let mut search = controller(&server, Duration::from_millis(400), Duration::from_secs(5));

    for value in ["a", "am", "ami"] {
        search.input(value);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    search.input("amix");
    assert_eq!(search.state(), SearchPhase::Debouncing);
    search.settle().await;

    assert_eq!(queries(&server).await, vec!["amix".to_string()]);
    assert_eq!(search.status(), ActionStatus::Fulfilled);
    assert_eq!(search.debounced_value().as_deref(), Some("amix"));
    assert_eq!(search.results(), vec![json!({ "name": "amix" })]);
}

#[tokio::test]
async fn newer_query_wins_over_slow_older_one() {
    let server = start_lookup_mock().await;
    mount_patients(&server, "slow", Duration::from_millis(600)).await;
    mount_patients(&server, "fast", Duration::ZERO).await;
    let mut search = controller(&server, Duration::from_millis(50), Duration::from_secs(5));

    search.input("slow");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(search.state(), SearchPhase::Fetching);
    search.input("fast");
    search.settle().await;
    assert_eq!(search.results(), vec![json!({ "name": "fast" })]);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(search.results(), vec![json!({ "name": "fast" })]);
    assert_eq!(search.status(), ActionStatus::Fulfilled);
    assert_eq!(search.state(), SearchPhase::Idle);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = start_lookup_mock().await;
    mount_patients(&server, "tyl", Duration::from_secs(2)).await;
    let mut search = controller(&server, Duration::from_millis(20), Duration::from_millis(100));

    search.input("tyl");
    search.settle().await;

    assert_eq!(search.status(), ActionStatus::Rejected);
    assert_eq!(search.error().as_deref(), Some("request timed out"));
    assert!(search.results().is_empty());
}

#[tokio::test]
async fn backend_failure_message_surfaces() {
    let server = start_lookup_mock().await;
    Mock::given(method("GET"))
        .and(path("/patients/search"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "index offline" })),
        )
        .mount(&server)
        .await;
    let mut search = controller(&server, Duration::from_millis(20), Duration::from_secs(5));

    search.input("smith");
    search.settle().await;

    assert_eq!(search.status(), ActionStatus::Rejected);
    assert_eq!(search.error().as_deref(), Some("index offline"));
}

#[tokio::test]
async fn short_query_clears_without_request() {
    let server = start_lookup_mock().await;
    mount_patients(&server, "jo", Duration::ZERO).await;
    let mut search = controller(&server, Duration::from_millis(20), Duration::from_secs(5));

    search.input("jo");
    search.settle().await;
    assert_eq!(search.results().len(), 1);

    search.input("j");
    search.settle().await;
    let empty: Vec<Value> = Vec::new();
    assert_eq!(search.results(), empty);
    assert_eq!(search.state(), SearchPhase::Idle);
    assert_eq!(queries(&server).await, vec!["jo".to_string()]);
}
