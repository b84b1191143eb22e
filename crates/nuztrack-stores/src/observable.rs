//! Generic observable state cell with optional persistence.
//!
//! Each [`Observable`] owns one value. Mutations go through [`update`]: the
//! closure receives a copy, and only if the copy differs from the current
//! value does the store swap it in, persist it, and notify listeners. A
//! mutation that produces an equal value is a no-op end to end, so listeners
//! never see spurious notifications.
//!
//! [`update`]: Observable::update

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use nuztrack_storage::{load_json, try_persist, LocalStore};

/// Handle returned by [`Observable::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct Observable<T> {
    state: Mutex<T>,
    listeners: Mutex<BTreeMap<u64, Listener<T>>>,
    next_id: AtomicU64,
    persist: Option<(Arc<dyn LocalStore>, &'static str)>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send,
{
    /// A store that lives only for the process lifetime.
    pub fn ephemeral(initial: T) -> Self {
        Self {
            state: Mutex::new(initial),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            persist: None,
        }
    }

    /// A store backed by one key in `store`. The persisted value is loaded at
    /// construction; a missing or unparsable value falls back to `default`.
    pub fn persisted(store: Arc<dyn LocalStore>, key: &'static str, default: T) -> Self {
        let initial = load_json(store.as_ref(), key).unwrap_or(default);
        Self {
            state: Mutex::new(initial),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            persist: Some((store, key)),
        }
    }

    /// Deep copy of the current value. Callers own the copy outright; later
    /// mutations of the store never show through it.
    pub fn snapshot(&self) -> T {
        self.lock_state().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_listeners().insert(id, Arc::new(listener));
        ListenerId(id)
    }

    /// Idempotent; unsubscribing an unknown or already-removed id does
    /// nothing.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.lock_listeners().remove(&id.0);
    }

    /// Apply `mutate` to a copy of the current value. Returns `true` when the
    /// value changed and listeners were notified.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> bool {
        let next = {
            let mut state = self.lock_state();
            let mut next = state.clone();
            mutate(&mut next);
            if next == *state {
                return false;
            }
            *state = next.clone();
            next
        };

        if let Some((store, key)) = &self.persist {
            try_persist(store.as_ref(), key, &next);
        }
        self.notify(&next);
        true
    }

    fn notify(&self, value: &T) {
        let ids: Vec<u64> = self.lock_listeners().keys().copied().collect();
        for id in ids {
            // Re-check membership so a listener removed mid-cycle is skipped,
            // and never hold the listener map lock across a callback.
            let listener = self.lock_listeners().get(&id).cloned();
            if let Some(listener) = listener {
                listener(value.clone());
            }
        }
    }

    // A poisoned lock still holds the last fully written value; update()
    // mutates a copy, so a panicking mutator never leaves partial state.
    fn lock_state(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, BTreeMap<u64, Listener<T>>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
