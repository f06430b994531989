//! Framing and classification for the hub's text protocol.
//!
//! Inbound traffic is a stream of `%`-terminated chunks. Each chunk is
//! classified into a [`ParsedMessage`]:
//! - `!RC:<sequence>:<payload>%` is the reply to a synchronous call
//! - `...CB:<id>:<payload>%` is a push notification for a registered event
//!
//! Anything else is unrecognized and dropped by the layers above. Outbound
//! text is built with [`Envelope`].

pub mod codec;
pub mod error;
pub mod marker;
pub mod reader;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_chunk, escape_command, message_body, Envelope, EventMessage, FrameConfig,
    ParsedMessage, ResultMessage, DEFAULT_MAX_CHUNK,
};
pub use error::{FrameError, Result};
pub use marker::{
    DELIMITER, EVALUATOR_DEFINITION, EVENT_CALLBACK_PREFIX, EVENT_TAG, INTERRUPT,
    LINE_TERMINATOR, RESULT_TAG, START_MARKER,
};
pub use reader::ChunkReader;

#[cfg(feature = "async")]
pub use async_codec::ChunkCodec;
