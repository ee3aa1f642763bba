// End-to-end tests for `vsrcheck check`, `plan` and `extract`.
//
// Each test points VSRCHECK_SETTINGS at a temp dir so the user's own
// settings file never leaks in.
//
// Run with: cargo test -p vsrcheck-cli --test check_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const REPORT: &str = "tests/fixtures/scan_report.htm";
const MASTER: &str = "tests/fixtures/master.csv";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

fn vsrcheck(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vsrcheck"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env("VSRCHECK_SETTINGS", home.join("settings.toml"));
    cmd.env_remove("VSRCHECK_REFERENCE");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    vsrcheck(home).args(args).output().expect("run vsrcheck")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_str(stdout(output).trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{}", stdout(output)))
}

// ===========================================================================
// check
// ===========================================================================

#[test]
fn check_prints_table_and_summary() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 8, "header + rule + 6 ECUs:\n{out}");
    assert!(lines[0].starts_with("ECU"));
    assert!(lines[3].starts_with("IPC") && lines[3].contains("Newer"));
    assert!(lines[4].starts_with("RFH") && lines[4].contains("Older"));
    assert!(lines[5].starts_with("TPMS") && lines[5].contains("N/A"));
    assert!(lines[6].starts_with("ADAS") && lines[6].contains("Not Found"));

    let err = stderr(&output);
    assert!(err.contains("scan_report.htm: 6 ECUs (1 no response), 3 need an update"), "{err}");
    assert!(err.contains("part: 2 match, 1 older, 1 newer, 2 not found"), "{err}");
}

#[test]
fn check_json_is_single_document() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value = json(&output);
    assert_eq!(value["meta"]["report"], "scan_report.htm");
    assert_eq!(value["meta"]["reference_entries"], 5);
    assert_eq!(value["summary"]["needs_update"], 3);
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 6);
    assert_eq!(results[0]["owner_fields"]["Subsystem Owner"], "Body Electrical");
    assert_eq!(results[4]["expected_sw"], "N/A");
    assert_eq!(results[4]["priority"], "N/A");
}

#[test]
fn strict_exits_3_on_mismatch() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER, "--strict"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("error: mismatches found"));

    // Only full matches left after filtering: strict passes.
    let output = run(
        home.path(),
        &["check", REPORT, "-r", MASTER, "--strict", "--part-status", "match", "--sw-status", "match"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn filters_narrow_results() {
    let home = tempfile::tempdir().unwrap();
    let output = run(
        home.path(),
        &["check", REPORT, "-r", MASTER, "--json", "--part-status", "not_found", "--hide", "ADAS"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value = json(&output);
    let names: Vec<&str> = value["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["ecu"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["TPMS"]);
    assert_eq!(value["plan"]["missing"], serde_json::json!(["TPMS"]));
}

#[test]
fn exports_are_written() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let csv = out.path().join("results.csv");
    let xlsx = out.path().join("results.xlsx");
    let json_path = out.path().join("results.json");

    let output = run(
        home.path(),
        &[
            "check", REPORT, "-r", MASTER,
            "--csv", csv.to_str().unwrap(),
            "--xlsx", xlsx.to_str().unwrap(),
            "-o", json_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = std::fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("ECU,Reported Part #,Expected Part #,Part Status"));
    assert_eq!(lines.count(), 6);

    assert!(std::fs::metadata(&xlsx).unwrap().len() > 0);

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["summary"]["total_ecus"], 6);
    assert!(stderr(&output).contains(&format!("wrote {}", csv.display())));
}

#[test]
fn settings_supply_reference_and_export_dir() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(
        home.path().join("settings.toml"),
        format!(
            "reference = {:?}\nexport_dir = {:?}\n",
            fixture(MASTER).display().to_string(),
            out.path().display().to_string(),
        ),
    )
    .unwrap();

    let output = run(home.path(), &["check", REPORT, "--csv", "from-settings.csv"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.path().join("from-settings.csv").exists());
}

#[test]
fn env_reference_is_used() {
    let home = tempfile::tempdir().unwrap();
    let output = vsrcheck(home.path())
        .env("VSRCHECK_REFERENCE", fixture(MASTER))
        .args(["check", REPORT, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json(&output)["meta"]["reference_entries"], 5);
}

// ===========================================================================
// plan
// ===========================================================================

#[test]
fn plan_groups_by_priority() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["plan", REPORT, "-r", MASTER]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Priority 1 (2)"), "{out}");
    assert!(out.contains("Priority 2 (0)\n  (none)"), "{out}");
    assert!(out.contains("Priority 3 (1)"), "{out}");
    assert!(out.contains("Other, no update needed: HVAC"), "{out}");
    assert!(out.contains("Missing from reference or scan: TPMS, ADAS"), "{out}");
    assert!(stderr(&output).contains("3 ECUs to update, 2 missing, 0 deferred"));
}

#[test]
fn plan_json_shape() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["plan", REPORT, "-r", MASTER, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value = json(&output);
    let p1: Vec<&str> = value["priority_1"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["ecu"].as_str().unwrap())
        .collect();
    assert_eq!(p1, ["TPMS", "ADAS"]);
    assert_eq!(value["priority_3"][0]["ecu"], "RFH");
    assert_eq!(value["deferred"], serde_json::json!([]));
}

// ===========================================================================
// extract
// ===========================================================================

#[test]
fn extract_lists_records_without_reference() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["extract", REPORT, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value = json(&output);
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[1]["sw_version"], "SW: 12.10.04 #2: 12.00.00");
    assert_eq!(records[3]["name"], "TPMS");
    assert_eq!(records[3]["part_number"], "N/A");
    assert!(stderr(&output).contains("6 ECUs (1 no response)"));
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn report_without_ecu_table_exits_4() {
    let home = tempfile::tempdir().unwrap();
    let report = home.path().join("empty.htm");
    std::fs::write(&report, "<html><body><p>nothing here</p></body></html>").unwrap();

    let output = run(home.path(), &["check", report.to_str().unwrap(), "-r", MASTER]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("hint:"));

    let output = run(home.path(), &["extract", report.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn missing_reference_exits_5() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("VSRCHECK_REFERENCE"));

    let output = run(home.path(), &["check", REPORT, "-r", "tests/fixtures/nope.csv"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn unsupported_reference_format_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", "master.json"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_report_exits_6() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", "tests/fixtures/nope.htm", "-r", MASTER]);
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn unwritable_export_exits_7() {
    let home = tempfile::tempdir().unwrap();
    let target = home.path().join("no-such-dir").join("out.csv");
    let output = run(home.path(), &["check", REPORT, "-r", MASTER, "--csv", target.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn invalid_config_exits_8() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("recon.toml");
    std::fs::write(&config, "[extract]\nmin_cells = 2\n").unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER, "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(8));

    std::fs::write(home.path().join("settings.toml"), "reference = [").unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER]);
    assert_eq!(output.status.code(), Some(8));
}

#[test]
fn custom_config_changes_columns() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("recon.toml");
    // Boot SW column instead of application SW.
    std::fs::write(&config, "[extract]\nsw_column = 6\n").unwrap();
    let output = run(home.path(), &["extract", REPORT, "--json", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json(&output)[0]["sw_version"], "01.00.00");
}

#[test]
fn bad_filter_value_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["check", REPORT, "-r", MASTER, "--part-status", "stale"]);
    assert_eq!(output.status.code(), Some(2));
}
