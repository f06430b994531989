//! Drive a SPIKE-style hub REPL over a serial link.
//!
//! spikelink sends remote-executable snippets to a hub, correlates the
//! out-of-order replies with the calls that requested them, and routes
//! unsolicited push notifications to registered handlers.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream transport abstraction (serial TTY, streams, in-memory)
//! - [`frame`]: Delimiter framing, reply/event classification, command envelopes
//! - [`exec`]: Command executor: pending calls, event registry, delivery path
//! - [`hub`]: Typed motor, sensor, button and display handles (behind `hub` feature)

/// Re-export transport types.
pub mod transport {
    pub use spikelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use spikelink_frame::*;
}

/// Re-export executor types.
pub mod exec {
    pub use spikelink_exec::*;
}

/// Re-export hub device types (requires `hub` feature).
#[cfg(feature = "hub")]
pub mod hub {
    pub use spikelink_hub::*;
}
