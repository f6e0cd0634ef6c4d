//! exit codes for sldbridge commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// command completed successfully
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// invalid command-line arguments
pub const INVALID_ARGS: i32 = 4;

/// configuration file missing, unreadable or invalid
pub const CONFIG_ERROR: i32 = 5;

/// an input is not a style layer descriptor document
pub const UNSUPPORTED_DOCUMENT: i32 = 6;
