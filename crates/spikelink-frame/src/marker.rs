//! Protocol markers shared by both directions of the link.

/// Terminates every inbound chunk.
pub const DELIMITER: u8 = b'%';

/// Precedes the reply body; everything before the last one is REPL echo.
pub const START_MARKER: u8 = b'!';

/// Tag of a reply to a synchronous call.
pub const RESULT_TAG: &str = "RC";

/// Tag of a push notification.
pub const EVENT_TAG: &str = "CB";

/// Opens the callback literal of an event registration line. An event tag
/// right after it is the REPL echoing the registration, not a notification.
pub const EVENT_CALLBACK_PREFIX: &str = "(lambda x: print(\"";

/// Appended to every outbound line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Ctrl-C: interrupts whatever the REPL is running.
pub const INTERRUPT: &str = "\u{3}";

/// Remote helper that evaluates a command and prints a tagged reply.
///
/// Must be defined on the hub before any synchronous call. The trailing
/// blank line closes the `def` block in the REPL.
pub const EVALUATOR_DEFINITION: &str = "def evaluator(msgType, counter, fn):\n return \"!{}:{}:{}%\".format(msgType, counter, eval(fn))\r\n";
