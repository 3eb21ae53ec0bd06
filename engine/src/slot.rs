//! Observable result cells written by the executor and read by the view layer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct SlotState<T> {
    committed: T,
    interim: Option<T>,
    version: u64,
}

/// Shared result of one operation.
///
/// Holds the last committed value plus an optional interim (placeholder)
/// value published while a call is pending. Readers see the interim value
/// when present, otherwise the committed one. Only the executor and the
/// mutator write; everything else reads a clone.
#[derive(Debug)]
pub struct ResultSlot<T> {
    inner: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ResultSlot<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState {
                committed: initial,
                interim: None,
                version: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Incremented on every commit; interim values do not bump it.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    #[must_use]
    pub fn is_interim(&self) -> bool {
        self.lock().interim.is_some()
    }

    /// Read through a borrow without cloning the whole value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.lock();
        f(state.interim.as_ref().unwrap_or(&state.committed))
    }

    pub(crate) fn publish_interim(&self, value: T) {
        self.lock().interim = Some(value);
    }

    pub(crate) fn discard_interim(&self) {
        self.lock().interim = None;
    }

    pub(crate) fn commit(&self, value: T) {
        let mut state = self.lock();
        state.committed = value;
        state.interim = None;
        state.version = state.version.saturating_add(1);
    }

    /// Edit the committed value in place (and any interim value with it).
    pub(crate) fn update(&self, mut f: impl FnMut(&mut T)) {
        let mut state = self.lock();
        f(&mut state.committed);
        if let Some(interim) = state.interim.as_mut() {
            f(interim);
        }
        state.version = state.version.saturating_add(1);
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Current observable value: interim if a placeholder is showing, else committed.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(Clone::clone)
    }

    /// Last committed value, ignoring any placeholder.
    #[must_use]
    pub fn committed(&self) -> T {
        self.lock().committed.clone()
    }
}
