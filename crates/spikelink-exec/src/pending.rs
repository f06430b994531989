use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::lock;

/// Receiving half of a registered call. Handed back to [`PendingCalls::wait`].
#[derive(Debug)]
pub struct PendingSlot {
    sequence: u64,
    rx: Receiver<String>,
}

impl PendingSlot {
    /// Sequence number this slot waits on.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Lifetime counters for a [`PendingCalls`] registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingStats {
    pub registered: u64,
    pub resolved: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    /// Results that arrived for a sequence with no waiting caller.
    pub dropped: u64,
}

#[derive(Default)]
struct PendingState {
    slots: HashMap<u64, SyncSender<String>>,
    stats: PendingStats,
}

/// Calls awaiting a reply, keyed by sequence number.
///
/// Every entry leaves the map exactly once: through `resolve`, a timed out
/// `wait`, or `cancel`. A value handed to `resolve` is pushed into the slot's
/// one-element channel while the lock is held, so a waiter that finds its
/// entry gone can always collect it.
#[derive(Default)]
pub struct PendingCalls {
    state: Mutex<PendingState>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot for `sequence`.
    pub fn register(&self, sequence: u64) -> Result<PendingSlot> {
        let mut state = lock(&self.state);
        if state.slots.contains_key(&sequence) {
            return Err(ExecError::DuplicateSequence(sequence));
        }
        let (tx, rx) = mpsc::sync_channel(1);
        state.slots.insert(sequence, tx);
        state.stats.registered += 1;
        Ok(PendingSlot { sequence, rx })
    }

    /// Deliver `payload` to the caller waiting on `sequence`.
    ///
    /// Returns `false` when no such call is pending (already resolved, timed
    /// out, or never issued); the payload is dropped.
    pub fn resolve(&self, sequence: u64, payload: String) -> bool {
        let mut state = lock(&self.state);
        let Some(tx) = state.slots.remove(&sequence) else {
            state.stats.dropped += 1;
            return false;
        };
        state.stats.resolved += 1;
        if tx.try_send(payload).is_err() {
            debug!(sequence, "waiter already gone; reply discarded");
        }
        true
    }

    /// Block until the slot is resolved or `timeout` elapses.
    pub fn wait(&self, slot: PendingSlot, timeout: Duration) -> Result<String> {
        let sequence = slot.sequence;
        match slot.rx.recv_timeout(timeout) {
            Ok(payload) => Ok(payload),
            Err(RecvTimeoutError::Timeout) => {
                let mut state = lock(&self.state);
                if state.slots.remove(&sequence).is_some() {
                    state.stats.timed_out += 1;
                    return Err(ExecError::Timeout {
                        sequence,
                        after: timeout,
                    });
                }
                drop(state);
                // Resolved between the deadline and taking the lock.
                match slot.rx.try_recv() {
                    Ok(payload) => Ok(payload),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                        Err(ExecError::Abandoned(sequence))
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                lock(&self.state).slots.remove(&sequence);
                Err(ExecError::Abandoned(sequence))
            }
        }
    }

    /// Remove a pending entry without waiting, e.g. after a failed write.
    pub fn cancel(&self, sequence: u64) -> bool {
        let mut state = lock(&self.state);
        let removed = state.slots.remove(&sequence).is_some();
        if removed {
            state.stats.cancelled += 1;
        }
        removed
    }

    pub fn contains(&self, sequence: u64) -> bool {
        lock(&self.state).slots.contains_key(&sequence)
    }

    /// Number of calls currently waiting.
    pub fn len(&self) -> usize {
        lock(&self.state).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PendingStats {
        lock(&self.state).stats
    }
}

impl std::fmt::Debug for PendingCalls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PendingCalls")
            .field("pending", &state.slots.len())
            .field("stats", &state.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn resolve_delivers_to_waiter() {
        let calls = PendingCalls::new();
        let slot = calls.register(0).unwrap();
        assert!(calls.resolve(0, "50".to_string()));
        assert_eq!(calls.wait(slot, Duration::from_secs(1)).unwrap(), "50");
        assert!(calls.is_empty());
    }

    #[test]
    fn resolve_is_exactly_once() {
        let calls = PendingCalls::new();
        let slot = calls.register(3).unwrap();
        assert!(calls.resolve(3, "first".into()));
        assert!(!calls.resolve(3, "second".into()));
        assert_eq!(calls.wait(slot, Duration::from_secs(1)).unwrap(), "first");

        let stats = calls.stats();
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn unknown_sequence_is_ignored() {
        let calls = PendingCalls::new();
        assert!(!calls.resolve(42, "x".into()));
        assert!(calls.is_empty());
        assert_eq!(calls.stats().dropped, 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let calls = PendingCalls::new();
        let _slot = calls.register(7).unwrap();
        let err = calls.register(7).unwrap_err();
        assert!(matches!(err, ExecError::DuplicateSequence(7)));
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn timeout_removes_entry() {
        let calls = PendingCalls::new();
        let slot = calls.register(1).unwrap();
        let err = calls.wait(slot, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { sequence: 1, .. }));
        assert!(!calls.contains(1));
        assert_eq!(calls.stats().timed_out, 1);

        // A late result for the expired call is dropped.
        assert!(!calls.resolve(1, "late".into()));
        assert_eq!(calls.stats().dropped, 1);
    }

    #[test]
    fn cancel_removes_entry_once() {
        let calls = PendingCalls::new();
        let _slot = calls.register(5).unwrap();
        assert!(calls.cancel(5));
        assert!(!calls.cancel(5));
        assert!(calls.is_empty());
        assert_eq!(calls.stats().cancelled, 1);
    }

    #[test]
    fn resolve_from_another_thread_wakes_waiter() {
        let calls = Arc::new(PendingCalls::new());
        let slot = calls.register(9).unwrap();

        let resolver = {
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                calls.resolve(9, "ready".into())
            })
        };

        assert_eq!(calls.wait(slot, Duration::from_secs(2)).unwrap(), "ready");
        assert!(resolver.join().unwrap());
    }

    #[test]
    fn many_waiters_each_get_their_own_payload() {
        let calls = Arc::new(PendingCalls::new());
        let slots: Vec<_> = (0..16).map(|seq| calls.register(seq).unwrap()).collect();

        let waiters: Vec<_> = slots
            .into_iter()
            .map(|slot| {
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    let seq = slot.sequence();
                    (seq, calls.wait(slot, Duration::from_secs(2)).unwrap())
                })
            })
            .collect();

        for seq in (0..16).rev() {
            assert!(calls.resolve(seq, format!("reply-{seq}")));
        }

        for waiter in waiters {
            let (seq, payload) = waiter.join().unwrap();
            assert_eq!(payload, format!("reply-{seq}"));
        }
        assert!(calls.is_empty());
    }
}
