//! Command/response correlation and event dispatch for a hub REPL link.
//!
//! [`CommandExecutor`] is the façade. Callers on any thread issue
//! synchronous calls that block until the matching `!RC:<seq>:...%` reply
//! arrives or a deadline passes, fire-and-forget commands, and event
//! registrations whose `CB:<id>:...%` notifications are routed to callbacks.
//! A single delivery path (see [`delivery`]) feeds inbound chunks to
//! [`CommandExecutor::on_inbound_chunk`].

pub mod config;
pub mod delivery;
pub mod error;
pub mod events;
pub mod executor;
pub mod pending;
pub mod sequence;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::{ExecutorConfig, DEFAULT_CALL_TIMEOUT};
pub use delivery::{run_delivery, DeliveryHandle, DeliveryReport};
pub use error::{ExecError, Result};
pub use events::{EventCallback, EventRegistry, EventStats, EventSubscription};
pub use executor::{CommandExecutor, ExecutorStats};
pub use pending::{PendingCalls, PendingSlot, PendingStats};
pub use sequence::SequenceAllocator;

#[cfg(feature = "async")]
pub use delivery::pump;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Registry invariants hold between statements, so a poisoned guard is
/// still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
