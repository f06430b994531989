use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ExecError, Result};
use crate::lock;

/// Handler invoked on the delivery path with the event payload.
pub type EventCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct EventSlot {
    callback: Mutex<Option<EventCallback>>,
}

/// A registered event id and its (replaceable) callback.
///
/// Cloning shares the slot: attaching a callback through any clone affects
/// all of them.
#[derive(Clone)]
pub struct EventSubscription {
    id: u32,
    slot: Arc<EventSlot>,
}

impl EventSubscription {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Attach a callback, replacing any previous one.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *lock(&self.slot.callback) = Some(Arc::new(callback));
    }

    /// Detach the callback. The id stays registered.
    pub fn clear(&self) {
        *lock(&self.slot.callback) = None;
    }

    pub fn has_callback(&self) -> bool {
        lock(&self.slot.callback).is_some()
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

/// Dispatch counters for an [`EventRegistry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub registered: u64,
    pub dispatched: u64,
    /// Events with an unknown id or no attached callback.
    pub unmatched: u64,
    /// Dispatches whose handler panicked.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    unmatched: AtomicU64,
    failed: AtomicU64,
}

/// Event ids and their handlers.
///
/// Ids are `max + 1` (starting at 1), allocated under the registry lock so
/// concurrent registrations never collide. Registrations are never removed.
#[derive(Default)]
pub struct EventRegistry {
    slots: Mutex<BTreeMap<u32, Arc<EventSlot>>>,
    counters: Counters,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next event id.
    pub fn register(&self) -> Result<EventSubscription> {
        let mut slots = lock(&self.slots);
        let id = match slots.keys().next_back() {
            Some(&max) => max.checked_add(1).ok_or(ExecError::EventIdsExhausted)?,
            None => 1,
        };
        let slot = Arc::new(EventSlot::default());
        slots.insert(id, Arc::clone(&slot));
        Ok(EventSubscription { id, slot })
    }

    /// Invoke the handler registered for `id`.
    ///
    /// Returns `true` when a handler ran, even if it panicked. The registry
    /// lock is released before the handler is called, so handlers may
    /// register further events.
    pub fn dispatch(&self, id: u32, payload: &str) -> bool {
        let slot = lock(&self.slots).get(&id).cloned();
        let callback = match &slot {
            Some(slot) => lock(&slot.callback).clone(),
            None => None,
        };
        let Some(callback) = callback else {
            self.counters.unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(id, "no handler for event");
            return false;
        };

        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        if panic::catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(id, "event handler panicked");
        }
        true
    }

    pub fn contains(&self, id: u32) -> bool {
        lock(&self.slots).contains_key(&id)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EventStats {
        EventStats {
            registered: self.len() as u64,
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            unmatched: self.counters.unmatched.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}
