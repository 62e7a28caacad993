//! Exit codes for miraictl

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors (unreadable files, I/O)
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the state file or pattern document fails validation
pub const EXIT_VALIDATION_FAILED: i32 = 2;

/// Exit code when a destructive command is run without its guard flag
pub const EXIT_REFUSED: i32 = 3;
