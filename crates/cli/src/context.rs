//! Loading shared by every command: settings, engine config, reference
//! table and the scan report itself.

use std::path::{Path, PathBuf};

use clap::Args;

use vsrcheck_config::Settings;
use vsrcheck_io::{ReferenceFile, ReferenceSource};
use vsrcheck_recon::model::{ReferenceTable, Status};
use vsrcheck_recon::{ReconConfig, ResultFilter};

use crate::exit_codes::{
    config_exit_code, reference_exit_code, EXIT_CONFIG, EXIT_REFERENCE, EXIT_REPORT_READ,
};
use crate::CliError;

/// Where the reference table comes from. Falls back to the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct ReferenceArgs {
    /// Reference table (.csv, .xlsx, .xlsm, .xls, .ods)
    #[arg(long, short = 'r', value_name = "PATH")]
    pub reference: Option<PathBuf>,

    /// Workbook sheet holding the reference table [default: Master SW List, else first sheet]
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,
}

/// Result filters shared by `check` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only ECUs whose part status is this (match, older, newer, not_found)
    #[arg(long, value_name = "STATUS")]
    pub part_status: Option<Status>,

    /// Keep only ECUs whose software status is this
    #[arg(long, value_name = "STATUS")]
    pub sw_status: Option<Status>,

    /// Drop an ECU from the results. Repeatable.
    #[arg(long, value_name = "ECU")]
    pub hide: Vec<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> ResultFilter {
        let mut filter = ResultFilter::default();
        if let Some(status) = self.part_status {
            filter = filter.part(status);
        }
        if let Some(status) = self.sw_status {
            filter = filter.sw(status);
        }
        self.hide.iter().fold(filter, |f, ecu| f.hide(ecu.as_str()))
    }
}

pub fn load_settings() -> Result<Settings, CliError> {
    Settings::load().map_err(|e| CliError {
        code: config_exit_code(&e),
        message: e.to_string(),
        hint: Some(format!("settings file: {}", Settings::resolved_path().display())),
    })
}

/// Engine config from `--config`, else the `[recon]` table of the settings file.
pub fn load_config(settings: &Settings, path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(settings.recon.clone());
    };
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    ReconConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

/// Resolve the reference file from flags, then settings/environment.
pub fn reference_file(settings: &Settings, args: &ReferenceArgs) -> Result<ReferenceFile, CliError> {
    let path = args
        .reference
        .clone()
        .or_else(|| settings.reference.clone())
        .ok_or_else(|| CliError {
            code: EXIT_REFERENCE,
            message: "no reference table given".into(),
            hint: Some("pass --reference PATH, set VSRCHECK_REFERENCE, or add `reference` to settings.toml".into()),
        })?;
    let sheet = args.sheet.clone().or_else(|| settings.reference_sheet.clone());
    ReferenceFile::new(path)
        .map(|file| file.with_sheet(sheet))
        .map_err(|e| CliError {
            code: reference_exit_code(&e),
            message: e.to_string(),
            hint: None,
        })
}

pub fn load_reference(file: &ReferenceFile) -> Result<ReferenceTable, CliError> {
    file.load().map_err(|e| CliError {
        code: reference_exit_code(&e),
        message: e.to_string(),
        hint: None,
    })
}

/// Read a scan report. Reports saved by older tools may be Windows-1252.
pub fn read_report(path: &Path) -> Result<String, CliError> {
    vsrcheck_io::csv::read_file_as_utf8(path).map_err(|e| CliError {
        code: EXIT_REPORT_READ,
        message: e.to_string(),
        hint: None,
    })
}

/// Name used for the report in output: the file name when there is one.
pub fn report_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
