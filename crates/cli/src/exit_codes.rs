//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, bad filter value)             |
//! | 3    | `--strict` and at least one ECU is not a full match  |
//! | 4    | Report contains no ECU rows                          |
//! | 5    | Reference table missing, unreadable or malformed     |
//! | 6    | Scan report unreadable                               |
//! | 7    | Export (csv/xlsx/json file) failed                   |
//! | 8    | Settings or engine config invalid                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use vsrcheck_config::ConfigError;
use vsrcheck_io::IoError;
use vsrcheck_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// `--strict` was given and the run found mismatches.
pub const EXIT_MISMATCH: u8 = 3;

/// The report has no ECU information table, or the table has no usable rows.
pub const EXIT_NO_ECU_DATA: u8 = 4;

/// Reference table could not be located, read or parsed.
pub const EXIT_REFERENCE: u8 = 5;

/// Scan report could not be read.
pub const EXIT_REPORT_READ: u8 = 6;

/// Writing an export file failed.
pub const EXIT_EXPORT: u8 = 7;

/// Settings file or `--config` file is invalid.
pub const EXIT_CONFIG: u8 = 8;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::NoEcuData { .. } => EXIT_NO_ECU_DATA,
    }
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

/// Map an I/O error raised while loading or saving the reference table.
pub fn reference_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Unsupported(_) => EXIT_USAGE,
        _ => EXIT_REFERENCE,
    }
}
