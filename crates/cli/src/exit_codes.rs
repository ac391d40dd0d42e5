//! CLI Exit Code Registry
//!
//! Single source of truth for `lmatch` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | Unmatched items remain (`run --strict` only)        |
//! | 2    | Usage error (bad arguments; emitted by clap)        |
//! | 3    | Invalid config (TOML syntax or validation)          |
//! | 4    | A ledger could not be loaded                        |
//! | 5    | Runtime failure (writing output, internal mismatch) |

use ledgermatch_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// `run --strict` found bank-only or internal-only items.
/// Like `diff(1)`, exit 1 means "ledgers differ."
pub const EXIT_UNMATCHED: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own; kept here so the table is complete.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A ledger file is missing, empty, headerless or unreadable.
pub const EXIT_LOAD_FAILURE: u8 = 4;

/// Anything else: output write failures, serialization errors.
pub const EXIT_RUNTIME: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::LoadFailure { .. } => EXIT_LOAD_FAILURE,
        ReconError::SourceMismatch { .. } | ReconError::Io(_) | ReconError::Serialize(_) => {
            EXIT_RUNTIME
        }
    }
}
