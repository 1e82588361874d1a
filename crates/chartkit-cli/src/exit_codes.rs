//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Stack error - unreadable or inconsistent stack file
pub const STACK_ERROR: i32 = 2;

/// Resolution error - chart version could not be resolved
pub const RESOLVE_ERROR: i32 = 3;

/// Install error - helm failed or could not be started
pub const INSTALL_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
