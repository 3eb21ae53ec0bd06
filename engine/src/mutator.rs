//! Queue/Workflow Mutator.
//!
//! Workflow commands never edit local lists optimistically. A successful
//! command re-fetches the tab that showed the message and refreshes the badge
//! counts, so the view always reflects the server. A failed command leaves
//! every list untouched and raises a notification instead.

use std::future::Future;

use rxtriage_core::{Notification, RemoteError};
use rxtriage_types::{
    CancelPayload, ClearScope, MessageId, OperationName, PatientId, RequestId, TabId,
};

use crate::backend::MessageBackend;
use crate::executor::ActionOutcome;
use crate::queue::MessageQueue;

impl<B: MessageBackend> MessageQueue<B> {
    pub async fn approve(&self, id: MessageId) -> bool {
        let owner = self.owning_tab_of(id);
        self.mutate(OperationName::APPROVE, owner, self.backend.approve(id))
            .await
    }

    pub async fn deny(&self, id: MessageId) -> bool {
        let owner = self.owning_tab_of(id);
        self.mutate(OperationName::DENY, owner, self.backend.deny(id))
            .await
    }

    pub async fn cancel(&self, id: MessageId, payload: CancelPayload) -> bool {
        let owner = self.owning_tab_of(id);
        self.mutate(OperationName::CANCEL, owner, self.backend.cancel(id, payload))
            .await
    }

    /// Flag (or unflag) every error message of a request as reviewed.
    pub async fn mark_reviewed(&self, request_id: RequestId, reviewed: bool) -> bool {
        let owner = self.owning_tab(|page| {
            page.messages
                .iter()
                .any(|message| message.request_id == request_id)
        });
        self.mutate(
            OperationName::MARK_REVIEWED,
            owner,
            self.backend.mark_reviewed(request_id, reviewed),
        )
        .await
    }

    /// Clear everything `tab` currently selects under its family's filter.
    pub async fn clear_all_in_tab(&self, tab: TabId) -> bool {
        let scope = ClearScope::Tab {
            filter: self.payload_for(tab),
        };
        self.mutate(OperationName::CLEAR_ALL, tab, self.backend.clear_all(scope))
            .await
    }

    pub async fn clear_all_for_patient(&self, patient_id: PatientId) -> bool {
        let owner = self.owning_tab(|page| {
            page.messages
                .iter()
                .any(|message| message.patient_id == patient_id)
        });
        let scope = ClearScope::Patient { patient_id };
        self.mutate(
            OperationName::CLEAR_ALL_FOR_PATIENT,
            owner,
            self.backend.clear_all(scope),
        )
        .await
    }

    /// Delete a message. On success it disappears from every loaded list at
    /// once, before the owning tab is re-fetched.
    pub async fn delete(&self, id: MessageId) -> bool {
        let owner = self.owning_tab_of(id);
        let applied = self
            .settle_mutation(&OperationName::DELETE, self.backend.delete(id))
            .await;
        if applied {
            self.forget(id);
            self.resync(owner).await;
        }
        applied
    }

    async fn mutate<F>(&self, op: OperationName, owner: TabId, work: F) -> bool
    where
        F: Future<Output = Result<(), RemoteError>>,
    {
        let applied = self.settle_mutation(&op, work).await;
        if applied {
            self.resync(owner).await;
        }
        applied
    }

    async fn settle_mutation<F>(&self, op: &OperationName, work: F) -> bool
    where
        F: Future<Output = Result<(), RemoteError>>,
    {
        match self.executor.run_detached(op, work).await {
            ActionOutcome::Fulfilled(()) | ActionOutcome::Superseded(Ok(())) => {
                tracing::info!(operation = %op, "mutation applied");
                self.notify(Notification::MutationApplied {
                    operation: op.to_string(),
                });
                true
            }
            ActionOutcome::Rejected { error, .. } | ActionOutcome::Superseded(Err(error)) => {
                tracing::warn!(operation = %op, error = ?error, "mutation failed");
                self.notify(Notification::MutationFailed {
                    operation: op.to_string(),
                    message: error,
                });
                false
            }
            ActionOutcome::Aborted => false,
        }
    }

    /// Exactly one re-fetch of `owner` plus one count refresh.
    async fn resync(&self, owner: TabId) {
        self.refresh_tab(owner).await;
        self.refresh_counts().await;
    }

    fn forget(&self, id: MessageId) {
        for tab in TabId::ALL {
            let slot = self.slot(tab);
            if !slot.with(|page| page.contains(id)) {
                continue;
            }
            slot.update(|page| {
                page.messages.retain(|message| message.id != id);
                page.total = page.total.saturating_sub(1);
            });
        }
    }
}
