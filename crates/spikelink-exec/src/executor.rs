use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use spikelink_frame::{decode_chunk, ChunkReader, Envelope, ParsedMessage};
use spikelink_transport::Transport;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::events::{EventRegistry, EventStats, EventSubscription};
use crate::lock;
use crate::pending::{PendingCalls, PendingStats};
use crate::sequence::SequenceAllocator;

/// Snapshot of executor activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub next_sequence: u64,
    pub pending: usize,
    pub calls: PendingStats,
    pub events: EventStats,
    pub unrecognized_chunks: u64,
}

/// Correlates commands with replies over one shared transport.
///
/// All methods take `&self`; share the executor behind an `Arc` between
/// caller threads and the delivery path. Outbound writes are serialized by
/// the transport mutex, inbound chunks by a separate delivery lock, so a
/// blocked caller never holds up delivery.
pub struct CommandExecutor<T> {
    transport: Mutex<T>,
    name: String,
    sequences: SequenceAllocator,
    pending: PendingCalls,
    events: EventRegistry,
    delivery: Mutex<()>,
    unrecognized: AtomicU64,
    config: ExecutorConfig,
}

impl<T: Transport> CommandExecutor<T> {
    /// Wrap a transport with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::default())
    }

    /// Wrap a transport with explicit configuration.
    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        let name = transport.name().to_string();
        Self {
            transport: Mutex::new(transport),
            name,
            sequences: SequenceAllocator::new(),
            pending: PendingCalls::new(),
            events: EventRegistry::new(),
            delivery: Mutex::new(()),
            unrecognized: AtomicU64::new(0),
            config,
        }
    }

    /// Override the default synchronous call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn open(&self) -> Result<()> {
        lock(&self.transport).open()?;
        info!(transport = %self.name, "executor link open");
        Ok(())
    }

    /// Close the transport. Pending calls run out their deadlines.
    pub fn close(&self) -> Result<()> {
        lock(&self.transport).close()?;
        info!(
            transport = %self.name,
            pending = self.pending.len(),
            "executor link closed"
        );
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        lock(&self.transport).is_open()
    }

    /// Transport name captured at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Evaluate `command` remotely and block for its reply, using the
    /// configured call timeout.
    pub fn execute_sync(&self, command: &str) -> Result<String> {
        self.execute_sync_with_timeout(command, self.config.call_timeout)
    }

    /// Evaluate `command` remotely and block until its reply arrives or
    /// `timeout` elapses.
    ///
    /// The pending slot is registered before the envelope is written, so a
    /// reply can never outrun its registration.
    pub fn execute_sync_with_timeout(&self, command: &str, timeout: Duration) -> Result<String> {
        let sequence = self.sequences.next_sequence();
        let slot = self.pending.register(sequence)?;

        let envelope = Envelope::Evaluate { sequence, command }.to_bytes();
        if let Err(err) = self.write(&envelope) {
            self.pending.cancel(sequence);
            warn!(sequence, error = %err, "call write failed");
            return Err(err);
        }
        debug!(sequence, command, "call sent");

        match self.pending.wait(slot, timeout) {
            Ok(payload) => {
                debug!(sequence, "call completed");
                Ok(payload)
            }
            Err(err) => {
                warn!(sequence, command, error = %err, "call failed");
                Err(err)
            }
        }
    }

    /// Send `command` as a raw line without waiting for anything.
    pub fn execute_fire_and_forget(&self, command: &str) -> Result<()> {
        self.write(&Envelope::Raw(command).to_bytes())?;
        debug!(command, "command sent");
        Ok(())
    }

    /// Register a remote event source with no callback attached yet.
    ///
    /// `method` is a remote callable taking a one-argument callback, e.g.
    /// `buttonLeft.on_change`. Attach a handler with
    /// [`EventSubscription::on_event`].
    pub fn register_event(&self, method: &str) -> Result<EventSubscription> {
        let subscription = self.events.register()?;
        self.send_registration(method, &subscription)?;
        Ok(subscription)
    }

    /// Register a remote event source and attach `callback` before the
    /// registration is sent, so no early notification is missed.
    pub fn register_event_with<F>(&self, method: &str, callback: F) -> Result<EventSubscription>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let subscription = self.events.register()?;
        subscription.on_event(callback);
        if let Err(err) = self.send_registration(method, &subscription) {
            subscription.clear();
            warn!(id = subscription.id(), method, error = %err, "event registration failed");
            return Err(err);
        }
        Ok(subscription)
    }

    /// Classify one delimiter-terminated chunk and route it.
    ///
    /// Results resolve the matching pending call; events run their handler on
    /// the calling thread. Chunks are processed one at a time even when
    /// several threads deliver. Unrecognized input is counted and dropped.
    pub fn on_inbound_chunk(&self, chunk: &[u8]) -> ParsedMessage {
        let _serial = lock(&self.delivery);
        let message = decode_chunk(chunk);

        if let Some(result) = message.result() {
            if !self.pending.resolve(result.sequence, result.payload.clone()) {
                debug!(sequence = result.sequence, "dropping result with no pending call");
            }
        }
        if let Some(event) = message.event() {
            self.events.dispatch(event.id, &event.payload);
        }
        if message.is_unrecognized() {
            self.unrecognized.fetch_add(1, Ordering::Relaxed);
            debug!(chunk = %String::from_utf8_lossy(chunk), "unrecognized chunk dropped");
        }

        message
    }

    /// Inbound half of the transport, framed into chunks.
    pub fn chunk_reader(&self) -> Result<ChunkReader<Box<dyn Read + Send>>> {
        let transport = lock(&self.transport);
        Ok(ChunkReader::from_transport(
            &*transport,
            self.config.frame.clone(),
        )?)
    }

    /// Number of calls currently blocked waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            next_sequence: self.sequences.peek(),
            pending: self.pending.len(),
            calls: self.pending.stats(),
            events: self.events.stats(),
            unrecognized_chunks: self.unrecognized.load(Ordering::Relaxed),
        }
    }

    fn send_registration(&self, method: &str, subscription: &EventSubscription) -> Result<()> {
        let id = subscription.id();
        self.write(&Envelope::EventRegistration { method, id }.to_bytes())?;
        debug!(id, method, "event registered");
        Ok(())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        lock(&self.transport).write(bytes)?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for CommandExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("name", &self.name)
            .field("pending", &self.pending)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}
