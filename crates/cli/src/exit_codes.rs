//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, missing file)                  |
//! | 3    | Mapping config invalid                                    |
//! | 4    | Cross-reference input malformed                           |
//! | 5    | Curation incomplete (too many unmatched rows)             |
//! | 6    | Name or link conflicts in the cross-reference             |
//! | 7    | Integrity violation (dangling link)                       |
//! | 8    | Store failure (open, write, commit)                       |
//! | 9    | Store already loaded and `--replace` not given            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the mapping functions below

use pudl_io::{LoadError, StoreError};
use pudl_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options or files.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Pipeline (3-9)
// =============================================================================

/// Mapping config failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Cross-reference input malformed: missing sheet or column, duplicate
/// header, non-integer id, blank canonical id or name.
pub const EXIT_INPUT_MALFORMED: u8 = 4;

/// A per-source projection has more incomplete rows than the policy allows.
pub const EXIT_CURATION_INCOMPLETE: u8 = 5;

/// Rows sharing an id disagree on name or canonical link.
pub const EXIT_CONFLICTS: u8 = 6;

/// A record references an id its target set does not hold, detected by the
/// engine or rejected by the store.
pub const EXIT_INTEGRITY: u8 = 7;

/// Store could not be opened, written or committed. Nothing was changed.
pub const EXIT_PERSISTENCE: u8 = 8;

/// Store already holds pipeline tables and the load was not told to
/// replace them.
pub const EXIT_STORE_NOT_EMPTY: u8 = 9;

// =============================================================================
// Error mapping
// =============================================================================

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReconError::CurationIncomplete { .. } => EXIT_CURATION_INCOMPLETE,
        ReconError::Conflicts { .. } => EXIT_CONFLICTS,
        ReconError::IntegrityViolation { .. } => EXIT_INTEGRITY,
        e if e.is_malformed_input() => EXIT_INPUT_MALFORMED,
        _ => EXIT_ERROR,
    }
}

pub fn load_exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::UnsupportedInput { .. } => EXIT_USAGE,
        _ => EXIT_INPUT_MALFORMED,
    }
}

pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::NotEmpty { .. } => EXIT_STORE_NOT_EMPTY,
        StoreError::Constraint { .. } => EXIT_INTEGRITY,
        StoreError::Sqlite(_) | StoreError::Missing { .. } | StoreError::NotLoaded { .. } => {
            EXIT_PERSISTENCE
        }
    }
}
