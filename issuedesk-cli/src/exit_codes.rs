//! Exit code constants for CLI commands
//!
//! These constants define the exit codes used throughout the application:
//! - 0: Success
//! - 1: General or operational failure
//! - 2: Validation errors (bad arguments, payloads or configuration)
//! - 3: The requested record does not exist
//! - 4: The operation conflicts with the stored state

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// General or operational failure
pub const EXIT_ERROR: i32 = 1;

/// Validation errors
pub const EXIT_VALIDATION: i32 = 2;

/// Missing record
pub const EXIT_MISSING: i32 = 3;

/// Conflict with stored state
pub const EXIT_CONFLICT: i32 = 4;
