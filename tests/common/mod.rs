//! Shared test utilities and fixtures
//!
//! [`Clinic`] is a stateful wiremock backend: searches and counts evaluate
//! the posted filter against an in-memory message table, and workflow
//! commands edit that table.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use rxtriage_client::{HttpBackend, RetryConfig};
use rxtriage_core::TriageConfig;
use rxtriage_engine::{FixedClock, QueueSettings, TriageStore};
use rxtriage_types::{
    DoctorId, FilterPayload, Message, MessageId, MessageStatus, MessageType, PatientId,
    PracticeId, RequestId,
};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn message(id: u64, message_type: MessageType, status: MessageStatus) -> Message {
    Message {
        id: MessageId::new(id),
        patient_id: PatientId::new(id * 10),
        message_type,
        message_status: status,
        request_id: RequestId::new(id + 100),
        created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        doctor_id: DoctorId::new(1),
        practice_id: PracticeId::new(1),
        reviewed_user_id: None,
        note: None,
    }
}

type Table = Arc<Mutex<Vec<Message>>>;

fn lock(table: &Table) -> MutexGuard<'_, Vec<Message>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

fn message_id(request: &Request) -> Option<MessageId> {
    request
        .url
        .path_segments()?
        .nth(1)?
        .parse()
        .ok()
        .map(MessageId::new)
}

pub struct Clinic {
    pub server: MockServer,
    table: Table,
}

impl Clinic {
    pub async fn start(messages: Vec<Message>) -> Self {
        let server = MockServer::start().await;
        let table: Table = Arc::new(Mutex::new(messages));

        let search_table = Arc::clone(&table);
        Mock::given(method("POST"))
            .and(path("/messages/search"))
            .respond_with(move |request: &Request| {
                let Ok(filter) = request.body_json::<FilterPayload>() else {
                    return ResponseTemplate::new(400).set_body_json(json!({ "message": "bad filter" }));
                };
                let matching: Vec<Message> = lock(&search_table)
                    .iter()
                    .filter(|message| filter.matches(message))
                    .cloned()
                    .collect();
                let total = matching.len();
                let page: Vec<Message> = matching
                    .into_iter()
                    .skip(filter.offset as usize)
                    .take(filter.limit as usize)
                    .collect();
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": { "messages": page, "total": total } }))
            })
            .mount(&server)
            .await;

        let count_table = Arc::clone(&table);
        Mock::given(method("POST"))
            .and(path("/messages/count"))
            .respond_with(move |request: &Request| {
                let Ok(filter) = request.body_json::<FilterPayload>() else {
                    return ResponseTemplate::new(400).set_body_json(json!({ "message": "bad filter" }));
                };
                let count = lock(&count_table)
                    .iter()
                    .filter(|message| filter.matches(message))
                    .count();
                ResponseTemplate::new(200).set_body_json(json!({ "response": { "count": count } }))
            })
            .mount(&server)
            .await;

        for (verb, status) in [
            ("approve", MessageStatus::Success),
            ("deny", MessageStatus::Declined),
        ] {
            let table = Arc::clone(&table);
            Mock::given(method("POST"))
                .and(path_regex(format!(r"^/messages/\d+/{verb}$")))
                .respond_with(move |request: &Request| {
                    let Some(id) = message_id(request) else {
                        return ResponseTemplate::new(400);
                    };
                    let mut messages = lock(&table);
                    match messages.iter_mut().find(|message| message.id == id) {
                        Some(message) => {
                            message.message_status = status;
                            ResponseTemplate::new(200).set_body_json(json!({ "response": {} }))
                        }
                        None => ResponseTemplate::new(404)
                            .set_body_json(json!({ "message": "message not found" })),
                    }
                })
                .mount(&server)
                .await;
        }

        let delete_table = Arc::clone(&table);
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/messages/\d+$"))
            .respond_with(move |request: &Request| {
                if let Some(id) = message_id(request) {
                    lock(&delete_table).retain(|message| message.id != id);
                }
                ResponseTemplate::new(204)
            })
            .mount(&server)
            .await;

        Self { server, table }
    }

    pub fn backend(&self) -> HttpBackend {
        HttpBackend::new(
            &self.server.uri(),
            Some("test-token".to_string()),
            Duration::from_secs(5),
            RetryConfig::default(),
        )
        .unwrap()
    }

    pub fn store(&self) -> TriageStore<HttpBackend> {
        TriageStore::with_clock(
            self.backend(),
            &TriageConfig::default(),
            QueueSettings::default(),
            Arc::new(FixedClock(today())),
        )
    }

    pub fn insert(&self, message: Message) {
        lock(&self.table).push(message);
    }

    pub fn status_of(&self, id: u64) -> Option<MessageStatus> {
        lock(&self.table)
            .iter()
            .find(|message| message.id == MessageId::new(id))
            .map(|message| message.message_status)
    }

    /// Requests received so far whose path is exactly `wanted`.
    pub async fn requests_to(&self, wanted: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == wanted)
            .collect()
    }
}

/// A backend that only answers `/patients/search`, for search sessions.
pub async fn start_lookup_mock() -> MockServer {
    MockServer::start().await
}

pub fn lookup_backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(
        &server.uri(),
        None,
        Duration::from_secs(5),
        RetryConfig::with_max_retries(0),
    )
    .unwrap()
}
