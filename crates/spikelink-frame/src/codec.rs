use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use crate::marker::{
    DELIMITER, EVENT_CALLBACK_PREFIX, EVENT_TAG, LINE_TERMINATOR, RESULT_TAG, START_MARKER,
};

/// Default maximum chunk size: 64 KiB.
pub const DEFAULT_MAX_CHUNK: usize = 64 * 1024;

/// Reply to a synchronous call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    /// Sequence number the call was issued with.
    pub sequence: u64,
    /// Text the remote evaluator printed.
    pub payload: String,
}

/// Push notification for a registered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    /// Event id embedded in the registration command.
    pub id: u32,
    /// Argument the remote callback was invoked with.
    pub payload: String,
}

/// Classification of one inbound chunk.
///
/// The result shape and the event shape are matched independently, so one
/// chunk can carry neither, either, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Result(ResultMessage),
    Event(EventMessage),
    ResultAndEvent(ResultMessage, EventMessage),
    Unrecognized,
}

impl ParsedMessage {
    /// The result part, if the chunk matched the result shape.
    pub fn result(&self) -> Option<&ResultMessage> {
        match self {
            Self::Result(result) | Self::ResultAndEvent(result, _) => Some(result),
            _ => None,
        }
    }

    /// The event part, if the chunk matched the event shape.
    pub fn event(&self) -> Option<&EventMessage> {
        match self {
            Self::Event(event) | Self::ResultAndEvent(_, event) => Some(event),
            _ => None,
        }
    }

    /// True when neither shape matched.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized)
    }

    /// Short label for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Result(_) => "result",
            Self::Event(_) => "event",
            Self::ResultAndEvent(_, _) => "result+event",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Extract the message body from a raw chunk.
///
/// The body starts after the last `!` (or at the beginning when there is
/// none) and stops before the trailing delimiter. Invalid UTF-8 is replaced.
pub fn message_body(chunk: &[u8]) -> String {
    let content = match chunk.split_last() {
        Some((&DELIMITER, rest)) => rest,
        _ => chunk,
    };
    let start = content
        .iter()
        .rposition(|&b| b == START_MARKER)
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&content[start..]).into_owned()
}

/// Classify one delimiter-terminated chunk.
///
/// Never fails: malformed or partial chunks come back as
/// [`ParsedMessage::Unrecognized`].
pub fn decode_chunk(chunk: &[u8]) -> ParsedMessage {
    let body = message_body(chunk);
    match (match_result(&body), match_event(body.trim())) {
        (Some(result), Some(event)) => ParsedMessage::ResultAndEvent(result, event),
        (Some(result), None) => ParsedMessage::Result(result),
        (None, Some(event)) => ParsedMessage::Event(event),
        (None, None) => ParsedMessage::Unrecognized,
    }
}

/// `RC:<digits>:<payload>`, anchored at the start of the body.
fn match_result(body: &str) -> Option<ResultMessage> {
    let rest = body.strip_prefix(RESULT_TAG)?.strip_prefix(':')?;
    let (digits, payload) = split_numbered(rest)?;
    Some(ResultMessage {
        sequence: digits.parse().ok()?,
        payload: payload.to_string(),
    })
}

/// `CB:<digits>:<payload>` anywhere in the body; the last occurrence that
/// carries a valid id wins. Occurrences inside an echoed registration line
/// are skipped.
fn match_event(body: &str) -> Option<EventMessage> {
    body.rmatch_indices(EVENT_TAG).find_map(|(pos, tag)| {
        if body[..pos].ends_with(EVENT_CALLBACK_PREFIX) {
            return None;
        }
        let rest = body[pos + tag.len()..].strip_prefix(':')?;
        let (digits, payload) = split_numbered(rest)?;
        Some(EventMessage {
            id: digits.parse().ok()?,
            payload: payload.to_string(),
        })
    })
}

/// Split `<digits>:<rest>` into its two parts.
fn split_numbered(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    let payload = text[end..].strip_prefix(':')?;
    Some((&text[..end], payload))
}

/// Escape a command for embedding in a double-quoted REPL string literal.
pub fn escape_command(command: &str) -> Cow<'_, str> {
    if !command.contains(['\\', '"', '\r', '\n']) {
        return Cow::Borrowed(command);
    }
    let mut escaped = String::with_capacity(command.len() + 8);
    for c in command.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Outbound line sent to the hub REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope<'a> {
    /// `evaluator("RC", <sequence>, "<command>")`: the reply comes back tagged
    /// with `sequence`.
    Evaluate { sequence: u64, command: &'a str },
    /// The command verbatim; no reply is correlated.
    Raw(&'a str),
    /// Hooks `method` with a lambda that prints `CB:<id>:<value>%`.
    EventRegistration { method: &'a str, id: u32 },
}

impl Envelope<'_> {
    /// Append the wire form, line terminator included.
    ///
    /// Wire format:
    /// ```text
    /// evaluator("RC", 7, "motorA.get_speed()")\r\n
    /// hub.display.show("hi")\r\n
    /// hub.button.left.callback(lambda x: print("CB:1:" + str(x) + "%"))\r\n
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        match *self {
            Envelope::Evaluate { sequence, command } => {
                let escaped = escape_command(command);
                dst.reserve(escaped.len() + 32);
                dst.put_slice(b"evaluator(\"");
                dst.put_slice(RESULT_TAG.as_bytes());
                dst.put_slice(b"\", ");
                dst.put_slice(sequence.to_string().as_bytes());
                dst.put_slice(b", \"");
                dst.put_slice(escaped.as_bytes());
                dst.put_slice(b"\")");
            }
            Envelope::Raw(command) => {
                dst.reserve(command.len() + LINE_TERMINATOR.len());
                dst.put_slice(command.as_bytes());
            }
            Envelope::EventRegistration { method, id } => {
                dst.reserve(method.len() + 48);
                dst.put_slice(method.as_bytes());
                dst.put_slice(EVENT_CALLBACK_PREFIX.as_bytes());
                dst.put_slice(EVENT_TAG.as_bytes());
                dst.put_u8(b':');
                dst.put_slice(id.to_string().as_bytes());
                dst.put_slice(b":\" + str(x) + \"");
                dst.put_u8(DELIMITER);
                dst.put_slice(b"\"))");
            }
        }
        dst.put_slice(LINE_TERMINATOR.as_bytes());
    }

    /// The wire form as an owned buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Configuration for chunk reading.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum chunk length, delimiter excluded. Default: 64 KiB.
    pub max_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK,
        }
    }
}
