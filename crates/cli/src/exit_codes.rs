//! CLI Exit Code Registry
//!
//! Single source of truth for `citycmp` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad arguments, unknown source)      |
//! | 3    | Merge plan failed to parse or validate           |
//! | 4    | An input table has no `state` / `city` column    |
//! | 5    | File could not be read, parsed or written        |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Merge plan TOML is malformed or fails validation.
pub const EXIT_INVALID_PLAN: u8 = 3;

/// A join input lacks a required key column.
pub const EXIT_MISSING_KEY: u8 = 4;

/// Read/parse/write failure on an input or output file.
pub const EXIT_IO: u8 = 5;
