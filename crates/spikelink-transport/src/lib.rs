//! Byte-stream transport abstraction for hub links.
//!
//! The hub speaks a line-oriented REPL over a serial link. This crate gives the
//! layers above a single [`Transport`] trait with three implementations:
//! - [`StreamTransport`] over any duplex stream (TTY files, Unix sockets)
//! - serial TTY opening in raw mode with a configured baud rate (Unix)
//! - [`MemoryTransport`] for host-side tests
//!
//! This is the lowest layer of spikelink. Framing of the inbound stream
//! lives in `spikelink-frame`.

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};
pub use memory::{MemoryTransport, WireTap};
pub use stream::StreamTransport;
pub use traits::{DuplexStream, Transport};

#[cfg(unix)]
pub use tty::{open_tty, tty_transport, TtyConfig, DEFAULT_BAUD_RATE};
