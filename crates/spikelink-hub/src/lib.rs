//! Typed device handles for a SPIKE-style hub.
//!
//! Every handle shares one [`spikelink_exec::CommandExecutor`]: actions go
//! out as raw REPL lines, readings are synchronous calls whose replies are
//! parsed into Rust types, and button changes arrive as events.

pub mod button;
pub mod error;
pub mod motor;
pub mod port;
pub mod reply;
pub mod sensors;
pub mod session;

pub use button::Button;
pub use error::{HubError, Result};
pub use motor::{Motor, StopAction};
pub use port::{ButtonId, Port};
pub use sensors::{ColorSensor, DistanceSensor, DistanceUnit};
pub use session::{HubConfig, HubSession, SPIKE_IMPORTS};
