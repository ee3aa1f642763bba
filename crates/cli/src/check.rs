//! `vsrcheck check`, `vsrcheck plan`, `vsrcheck extract`: run a scan report
//! against the reference table.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use vsrcheck_config::Settings;
use vsrcheck_io::csv::{result_cells, RESULT_HEADERS};
use vsrcheck_recon::model::{display_or_na, ClassificationResult, ReconResult, RemediationPlan};

use crate::context::{self, FilterArgs, ReferenceArgs};
use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_EXPORT, EXIT_MISMATCH, EXIT_NO_ECU_DATA};
use crate::util::render_table;
use crate::CliError;

/// Inputs common to every command that runs the engine.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scan report (.htm/.html)
    pub report: PathBuf,

    #[command(flatten)]
    pub reference: ReferenceArgs,

    /// Engine config TOML ([extract] and [compare] tables)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Export destinations. Relative paths resolve against `export_dir` in settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Write results as CSV
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Write a workbook with Results and Remediation sheets
    #[arg(long, value_name = "PATH")]
    pub xlsx: Option<PathBuf>,

    /// Write the full run as JSON
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

fn export_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError {
        code: EXIT_EXPORT,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    }
}

fn stdout_err(e: impl std::fmt::Display) -> CliError {
    CliError {
        code: EXIT_ERROR,
        message: format!("cannot write to stdout: {e}"),
        hint: None,
    }
}

/// Load everything and run the engine.
fn execute(args: &RunArgs) -> Result<(Settings, ReconResult), CliError> {
    let settings = context::load_settings()?;
    let config = context::load_config(&settings, args.config.as_deref())?;
    let file = context::reference_file(&settings, &args.reference)?;
    let reference = context::load_reference(&file)?;
    let document = context::read_report(&args.report)?;

    let result = vsrcheck_recon::run(
        &config,
        &context::report_name(&args.report),
        &document,
        &reference,
        &args.filter.to_filter(),
    )
    .map_err(|e| CliError {
        code: recon_exit_code(&e),
        message: e.to_string(),
        hint: (recon_exit_code(&e) == EXIT_NO_ECU_DATA)
            .then(|| "is this a scan report? pass --config to point at a different table".to_string()),
    })?;
    Ok((settings, result))
}

fn write_exports(settings: &Settings, exports: &ExportArgs, result: &ReconResult) -> Result<(), CliError> {
    if let Some(path) = &exports.csv {
        let path = settings.export_path(path);
        vsrcheck_io::csv::write_results_file(&path, &result.results).map_err(|e| export_err(&path, e))?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &exports.xlsx {
        let path = settings.export_path(path);
        vsrcheck_io::xlsx::export_report(&path, result).map_err(|e| export_err(&path, e))?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &exports.output {
        let path = settings.export_path(path);
        vsrcheck_io::json::export(result, &path).map_err(|e| export_err(&path, e))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn results_table(results: &[ClassificationResult]) -> String {
    let rows: Vec<Vec<String>> = results.iter().map(result_cells).collect();
    render_table(&RESULT_HEADERS, &rows)
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} ECUs ({} no response), {} need an update",
        result.meta.report, s.total_ecus, s.no_response, s.needs_update,
    );
    eprintln!(
        "  part: {} match, {} older, {} newer, {} not found",
        s.part.matched, s.part.older, s.part.newer, s.part.not_found,
    );
    eprintln!(
        "  sw:   {} match, {} older, {} newer, {} not found",
        s.sw.matched, s.sw.older, s.sw.newer, s.sw.not_found,
    );
}

pub fn cmd_check(args: RunArgs, exports: ExportArgs, json: bool, strict: bool) -> Result<(), CliError> {
    let (settings, result) = execute(&args)?;
    write_exports(&settings, &exports, &result)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        vsrcheck_io::json::write_result(&mut out, &result).map_err(stdout_err)?;
    } else {
        out.write_all(results_table(&result.results).as_bytes()).map_err(stdout_err)?;
    }

    print_summary(&result);

    if strict && result.summary.has_mismatches() {
        return Err(CliError {
            code: EXIT_MISMATCH,
            message: "mismatches found".into(),
            hint: None,
        });
    }
    Ok(())
}

/// Human rendering of a plan, one section per bucket.
pub fn render_plan(plan: &RemediationPlan) -> String {
    let mut out = String::new();
    for (level, bucket) in plan.buckets() {
        out.push_str(&format!("Priority {level} ({})\n", bucket.len()));
        if bucket.is_empty() {
            out.push_str("  (none)\n");
        } else {
            for line in results_table(bucket).lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
    }

    let lists = [
        ("Other, no update needed", &plan.other_no_update),
        ("Missing from reference or scan", &plan.missing),
        ("Deferred (priority 0)", &plan.deferred),
    ];
    for (title, names) in lists {
        let joined = if names.is_empty() { "(none)".to_string() } else { names.join(", ") };
        out.push_str(&format!("{title}: {joined}\n"));
    }
    out
}

pub fn cmd_plan(args: RunArgs, exports: ExportArgs, json: bool) -> Result<(), CliError> {
    let (settings, result) = execute(&args)?;
    write_exports(&settings, &exports, &result)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &result.plan).map_err(stdout_err)?;
        writeln!(out).map_err(stdout_err)?;
    } else {
        out.write_all(render_plan(&result.plan).as_bytes()).map_err(stdout_err)?;
    }

    eprintln!(
        "{}: {} ECUs to update, {} missing, {} deferred",
        result.meta.report,
        result.plan.update_count(),
        result.plan.missing.len(),
        result.plan.deferred.len(),
    );
    Ok(())
}

/// Records only; no reference table needed.
pub fn cmd_extract(report: PathBuf, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let settings = context::load_settings()?;
    let config = context::load_config(&settings, config.as_deref())?;
    let document = context::read_report(&report)?;

    let records = vsrcheck_recon::extract(&document, &config.extract);
    if records.is_empty() {
        let e = vsrcheck_recon::ReconError::NoEcuData { report: context::report_name(&report) };
        return Err(CliError {
            code: recon_exit_code(&e),
            message: e.to_string(),
            hint: None,
        });
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &records).map_err(stdout_err)?;
        writeln!(out).map_err(stdout_err)?;
    } else {
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    display_or_na(r.part_number.as_deref()).to_string(),
                    display_or_na(r.sw_version.as_deref()).to_string(),
                ]
            })
            .collect();
        out.write_all(render_table(&["ECU", "Part #", "SW Version"], &rows).as_bytes())
            .map_err(stdout_err)?;
    }

    let silent = records.iter().filter(|r| !r.responded()).count();
    eprintln!("{}: {} ECUs ({silent} no response)", context::report_name(&report), records.len());
    Ok(())
}
