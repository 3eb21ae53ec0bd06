//! Seams between the engine and whatever talks to the server.

use std::future::Future;

use rxtriage_core::RemoteError;
use rxtriage_types::{
    CancelPayload, ClearScope, FilterPayload, MessageId, MessagePage, RequestId,
};

/// Remote message store.
///
/// Implementations map each call onto one backend request and normalize
/// failures into [`RemoteError`].
pub trait MessageBackend: Send + Sync + 'static {
    fn fetch_messages(
        &self,
        filter: FilterPayload,
    ) -> impl Future<Output = Result<MessagePage, RemoteError>> + Send;

    fn count_messages(
        &self,
        filter: FilterPayload,
    ) -> impl Future<Output = Result<u64, RemoteError>> + Send;

    fn approve(&self, id: MessageId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn deny(&self, id: MessageId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn cancel(
        &self,
        id: MessageId,
        payload: CancelPayload,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn mark_reviewed(
        &self,
        request_id: RequestId,
        reviewed: bool,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn clear_all(&self, scope: ClearScope) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn delete(&self, id: MessageId) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Typeahead lookup (patients, pharmacies, drugs) or free-text message search.
pub trait SearchSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn search(
        &self,
        query: String,
    ) -> impl Future<Output = Result<Vec<Self::Item>, RemoteError>> + Send;
}
