use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use tokio::sync::oneshot;

use rxtriage_core::RemoteError;
use rxtriage_types::{
    CancelPayload, ClearScope, DoctorId, FilterPayload, Message, MessageId, MessagePage,
    MessageStatus, MessageType, PatientId, PracticeId, RequestId,
};

use crate::backend::MessageBackend;

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

pub(crate) fn message(id: u64, message_type: MessageType, status: MessageStatus) -> Message {
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

/// In-memory server that applies mutations to its own copy of the messages.
#[derive(Default)]
pub(crate) struct FakeBackend {
    store: Mutex<Vec<Message>>,
    calls: Mutex<Vec<&'static str>>,
    fetches: Mutex<Vec<FilterPayload>>,
    failures: Mutex<HashMap<&'static str, String>>,
    held_fetch: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeBackend {
    pub(crate) fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            store: Mutex::new(messages),
            ..Self::default()
        }
    }

    /// Make every later `kind` call fail; an empty message fails without one.
    pub(crate) fn fail(&self, kind: &'static str, message: &str) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(kind, message.to_string());
    }

    /// Make the next fetch wait until the returned sender fires (or drops).
    /// The fetch still answers for the filter it was called with.
    pub(crate) fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        *self.held_fetch.lock().expect("held fetch lock") = Some(held);
        release
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn call_count(&self, kind: &str) -> usize {
        self.calls().iter().filter(|call| **call == kind).count()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    pub(crate) fn last_fetch(&self) -> Option<FilterPayload> {
        self.fetches.lock().expect("fetches lock").last().cloned()
    }

    pub(crate) fn stored(&self) -> Vec<Message> {
        self.store.lock().expect("store lock").clone()
    }

    fn record(&self, kind: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().expect("calls lock").push(kind);
        match self.failures.lock().expect("failures lock").get(kind) {
            Some(message) if message.is_empty() => Err(RemoteError::from_payload(&json!({}))),
            Some(message) => Err(RemoteError::from_payload(&json!({ "message": message }))),
            None => Ok(()),
        }
    }

    fn set_status(&self, id: MessageId, status: MessageStatus) -> Result<(), RemoteError> {
        let mut store = self.store.lock().expect("store lock");
        let message = store
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or_else(|| RemoteError::from_http(404, r#"{"message":"message not found"}"#))?;
        message.message_status = status;
        Ok(())
    }
}

impl MessageBackend for FakeBackend {
    async fn fetch_messages(&self, filter: FilterPayload) -> Result<MessagePage, RemoteError> {
        self.record("fetch")?;
        self.fetches.lock().expect("fetches lock").push(filter.clone());
        let held = self.held_fetch.lock().expect("held fetch lock").take();
        if let Some(held) = held {
            held.await.ok();
        }
        let matching: Vec<Message> = self
            .stored()
            .into_iter()
            .filter(|message| filter.matches(message))
            .collect();
        let total = matching.len() as u64;
        let messages = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok(MessagePage { messages, total })
    }

    async fn count_messages(&self, filter: FilterPayload) -> Result<u64, RemoteError> {
        self.record("count")?;
        Ok(self
            .stored()
            .iter()
            .filter(|message| filter.matches(message))
            .count() as u64)
    }

    async fn approve(&self, id: MessageId) -> Result<(), RemoteError> {
        self.record("approve")?;
        self.set_status(id, MessageStatus::Success)
    }

    async fn deny(&self, id: MessageId) -> Result<(), RemoteError> {
        self.record("deny")?;
        self.set_status(id, MessageStatus::Declined)
    }

    async fn cancel(&self, id: MessageId, payload: CancelPayload) -> Result<(), RemoteError> {
        self.record("cancel")?;
        self.set_status(id, MessageStatus::Declined)?;
        let mut store = self.store.lock().expect("store lock");
        if let Some(message) = store.iter_mut().find(|message| message.id == id) {
            message.note = Some(payload.reason);
        }
        Ok(())
    }

    async fn mark_reviewed(&self, request_id: RequestId, reviewed: bool) -> Result<(), RemoteError> {
        self.record("markReviewed")?;
        let status = if reviewed {
            MessageStatus::ErrorReviewed
        } else {
            MessageStatus::Error
        };
        let mut store = self.store.lock().expect("store lock");
        for message in store
            .iter_mut()
            .filter(|message| message.request_id == request_id)
        {
            message.message_status = status;
        }
        Ok(())
    }

    async fn clear_all(&self, scope: ClearScope) -> Result<(), RemoteError> {
        self.record("clearAll")?;
        let mut store = self.store.lock().expect("store lock");
        match scope {
            ClearScope::Tab { filter } => store.retain(|message| !filter.matches(message)),
            ClearScope::Patient { patient_id } => {
                store.retain(|message| message.patient_id != patient_id);
            }
        }
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> Result<(), RemoteError> {
        self.record("delete")?;
        let mut store = self.store.lock().expect("store lock");
        let before = store.len();
        store.retain(|message| message.id != id);
        if store.len() == before {
            return Err(RemoteError::from_http(404, r#"{"message":"message not found"}"#));
        }
        Ok(())
    }
}
