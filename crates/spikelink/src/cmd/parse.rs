use spikelink_frame::decode_chunk;

use crate::cmd::ParseArgs;
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_parsed, OutputFormat};

/// Exits with DATA_INVALID when the chunk is neither a result nor an event.
pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let message = decode_chunk(args.chunk.as_bytes());
    print_parsed(&args.chunk, &message, format);
    if message.is_unrecognized() {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
