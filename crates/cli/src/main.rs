// vsrcheck - compare ECU part numbers and software versions in a scan report
// against a reference table

mod check;
mod context;
mod exit_codes;
mod reference;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use check::{ExportArgs, RunArgs};
use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use reference::ReferenceCommands;

#[derive(Parser)]
#[command(name = "vsrcheck")]
#[command(about = "Check ECU part numbers and software versions from a scan report against a reference table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG applies when not given.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every ECU in a scan report
    #[command(after_help = "\
Examples:
  vsrcheck check scan.htm -r master.xlsx
  vsrcheck check scan.htm -r master.csv --json
  vsrcheck check scan.htm --xlsx report.xlsx --csv report.csv
  vsrcheck check scan.htm --part-status older --hide HVAC
  vsrcheck check scan.htm --strict || echo \"vehicle needs updates\"")]
    Check {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        export: ExportArgs,

        /// Output the full run as JSON on stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Exit 3 when any ECU is not a full match
        #[arg(long)]
        strict: bool,
    },

    /// Print the remediation plan, grouped by priority
    #[command(after_help = "\
Examples:
  vsrcheck plan scan.htm -r master.xlsx
  vsrcheck plan scan.htm --json
  vsrcheck plan scan.htm --xlsx remediation.xlsx")]
    Plan {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        export: ExportArgs,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the ECU rows found in a scan report
    #[command(after_help = "\
Examples:
  vsrcheck extract scan.htm
  vsrcheck extract scan.htm --json")]
    Extract {
        /// Scan report (.htm/.html)
        report: PathBuf,

        /// Engine config TOML ([extract] table)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Output records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and maintain the reference table
    Reference {
        #[command(subcommand)]
        command: ReferenceCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  vsrcheck-recon ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Log to stderr. `-v` wins over RUST_LOG; with neither, only warnings show.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { run, export, json, strict } => check::cmd_check(run, export, json, strict),
        Commands::Plan { run, export, json } => check::cmd_plan(run, export, json),
        Commands::Extract { report, config, json } => check::cmd_extract(report, config, json),
        Commands::Reference { command } => reference::cmd_reference(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_with_filters_and_exports() {
        let cli = Cli::try_parse_from([
            "vsrcheck", "-vv", "check", "scan.htm", "-r", "master.xlsx", "--part-status", "older",
            "--hide", "HVAC", "--hide", "IPC", "--xlsx", "out.xlsx", "--strict",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Check { run, export, json, strict } => {
                assert_eq!(run.report, PathBuf::from("scan.htm"));
                assert_eq!(run.reference.reference, Some(PathBuf::from("master.xlsx")));
                assert_eq!(run.filter.part_status, Some(vsrcheck_recon::Status::Older));
                assert_eq!(run.filter.hide, vec!["HVAC", "IPC"]);
                assert_eq!(export.xlsx, Some(PathBuf::from("out.xlsx")));
                assert!(strict && !json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn bad_status_is_rejected() {
        assert!(Cli::try_parse_from(["vsrcheck", "check", "scan.htm", "--sw-status", "stale"]).is_err());
    }

    #[test]
    fn error_hint_builder() {
        let err = CliError::args("bad").with_hint("try --help");
        assert_eq!(err.code, EXIT_USAGE);
        assert_eq!(err.hint.as_deref(), Some("try --help"));
    }
}
