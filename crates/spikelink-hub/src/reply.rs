//! Conversions from REPL reply text to typed readings.

use crate::error::{HubError, Result};

/// Python's `repr(None)`; sensors report it when nothing is in range.
pub const NONE_READING: &str = "None";

fn invalid(command: &str, reply: &str) -> HubError {
    HubError::InvalidReply {
        command: command.to_string(),
        reply: reply.to_string(),
    }
}

/// Parse an integer reply.
pub fn parse_int(command: &str, reply: &str) -> Result<i32> {
    reply.trim().parse().map_err(|_| invalid(command, reply))
}

/// Parse a sensor reading, mapping `None` to 0.
pub fn parse_reading(command: &str, reply: &str) -> Result<i32> {
    if reply.trim() == NONE_READING {
        return Ok(0);
    }
    parse_int(command, reply)
}

/// Parse a Python boolean (`True`/`False`).
pub fn parse_bool(command: &str, reply: &str) -> Result<bool> {
    match reply.trim() {
        "True" | "true" => Ok(true),
        "False" | "false" => Ok(false),
        _ => Err(invalid(command, reply)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings() {
        assert_eq!(parse_reading("d()", "50").unwrap(), 50);
        assert_eq!(parse_reading("d()", "None").unwrap(), 0);
        assert_eq!(parse_int("s()", "-75").unwrap(), -75);
        assert!(parse_int("s()", "None").is_err());
    }

    #[test]
    fn invalid_reply_keeps_context() {
        let err = parse_int("motorA.get_speed()", "Traceback").unwrap_err();
        match err {
            HubError::InvalidReply { command, reply } => {
                assert_eq!(command, "motorA.get_speed()");
                assert_eq!(reply, "Traceback");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn booleans() {
        assert!(parse_bool("x()", "True").unwrap());
        assert!(!parse_bool("x()", "False").unwrap());
        assert!(parse_bool("x()", "1").is_err());
    }
}
