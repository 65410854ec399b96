//! Exit code constants for the promptpipe CLI.
//!
//! - 0: Success
//! - 1: Configuration error (bad flags or config file)
//! - 2: I/O failure (input unreadable, output unwritable)
//! - 3: Generation failure (model load or inference fault)
//! - 4: Response marker missing from the generated text

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error: invalid flags, unparsable or invalid config file.
pub const CONFIG_ERROR: i32 = 1;

/// I/O failure: input file unreadable or not valid UTF-8, output unwritable.
pub const IO_FAILURE: i32 = 2;

/// Generation failure: the model backend failed to load or to produce a result.
pub const GENERATION_FAILURE: i32 = 3;

/// Marker failure: the response marker was absent from the generated exchange.
pub const MARKER_FAILURE: i32 = 4;
