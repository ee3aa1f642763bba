//! `vsrcheck reference`: inspect and maintain the reference table.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Subcommand;

use vsrcheck_io::reference::{entry_row, table_headers, COL_ECU, OWNER_COLUMNS};
use vsrcheck_io::{audit, IoError, ReferenceFile, ReferenceSink};
use vsrcheck_recon::model::{EcuRecord, Priority, ReferenceEntry, ReferenceTable};

use crate::context::{self, ReferenceArgs};
use crate::exit_codes::{reference_exit_code, EXIT_ERROR, EXIT_NO_ECU_DATA, EXIT_REFERENCE};
use crate::util::render_table;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReferenceCommands {
    /// Check the reference table for duplicates, empty fields and bad values
    #[command(after_help = "\
Examples:
  vsrcheck reference validate -r master.xlsx
  vsrcheck reference validate -r master.xlsx --sheet \"Master SW List\"")]
    Validate {
        #[command(flatten)]
        reference: ReferenceArgs,
    },

    /// Print the reference table, or a single ECU's entry
    #[command(after_help = "\
Examples:
  vsrcheck reference show -r master.csv
  vsrcheck reference show BCM -r master.csv
  vsrcheck reference show -r master.csv --csv > master-copy.csv")]
    Show {
        /// Only this ECU
        ecu: Option<String>,

        #[command(flatten)]
        reference: ReferenceArgs,

        /// Print CSV instead of an aligned table
        #[arg(long)]
        csv: bool,
    },

    /// Add or update one ECU's expected values
    #[command(after_help = "\
Examples:
  vsrcheck reference set BCM --part 68400001AC --sw 20.06.00 -r master.xlsx
  vsrcheck reference set RFH --priority 2 --fi-owner \"Ortiz, J.\" -r master.csv")]
    Set {
        /// ECU name (exact, case-sensitive)
        ecu: String,

        #[command(flatten)]
        reference: ReferenceArgs,

        /// Expected part number
        #[arg(long)]
        part: Option<String>,

        /// Expected software version
        #[arg(long)]
        sw: Option<String>,

        /// Priority 0-3
        #[arg(long)]
        priority: Option<String>,

        #[arg(long, value_name = "NAME")]
        fi_owner: Option<String>,

        #[arg(long, value_name = "NAME")]
        subsystem_owner: Option<String>,
    },

    /// Take expected values from a scan report
    #[command(after_help = "\
Examples:
  vsrcheck reference adopt scan.htm -r master.xlsx --ecu BCM --ecu IPC
  vsrcheck reference adopt scan.htm -r master.xlsx")]
    Adopt {
        /// Scan report (.htm/.html)
        report: PathBuf,

        #[command(flatten)]
        reference: ReferenceArgs,

        /// ECU to adopt. Repeatable. Without it, every responding ECU already in the table is updated.
        #[arg(long, value_name = "ECU")]
        ecu: Vec<String>,

        /// Engine config TOML used for extraction
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

pub fn cmd_reference(cmd: ReferenceCommands) -> Result<(), CliError> {
    match cmd {
        ReferenceCommands::Validate { reference } => cmd_validate(reference),
        ReferenceCommands::Show { ecu, reference, csv } => cmd_show(ecu, reference, csv),
        ReferenceCommands::Set {
            ecu,
            reference,
            part,
            sw,
            priority,
            fi_owner,
            subsystem_owner,
        } => {
            let owners = [fi_owner, subsystem_owner];
            cmd_set(ecu, reference, part, sw, priority, owners)
        }
        ReferenceCommands::Adopt { report, reference, ecu, config } => cmd_adopt(report, reference, ecu, config),
    }
}

fn ref_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn open(args: &ReferenceArgs) -> Result<(ReferenceFile, ReferenceTable), CliError> {
    let settings = context::load_settings()?;
    let file = context::reference_file(&settings, args)?;
    let table = context::load_reference(&file)?;
    Ok((file, table))
}

/// Like [`open`], but a file that does not exist yet is an empty table.
fn open_or_create(args: &ReferenceArgs) -> Result<(ReferenceFile, ReferenceTable), CliError> {
    let settings = context::load_settings()?;
    let file = context::reference_file(&settings, args)?;
    if !file.path().exists() {
        tracing::info!(path = %file.path().display(), "starting a new reference table");
        return Ok((file, ReferenceTable::new()));
    }
    let table = context::load_reference(&file)?;
    Ok((file, table))
}

fn save(file: &ReferenceFile, table: &ReferenceTable) -> Result<(), CliError> {
    file.save(table).map_err(|e| {
        let hint = matches!(e, IoError::DuplicateRows { .. })
            .then(|| "run `vsrcheck reference validate` to list them; the file was not changed".to_string());
        CliError {
            code: reference_exit_code(&e),
            message: e.to_string(),
            hint,
        }
    })
}

fn cmd_validate(args: ReferenceArgs) -> Result<(), CliError> {
    let (file, table) = open(&args)?;
    let issues = audit(&table);
    for issue in &issues {
        println!("{issue}");
    }

    if issues.is_empty() {
        eprintln!("valid: {} with {} ECU(s)", file.path().display(), table.len());
        Ok(())
    } else {
        Err(ref_err(
            EXIT_REFERENCE,
            format!("{}: {} issue(s) in {} ECU(s)", file.path().display(), issues.len(), table.len()),
        ))
    }
}

fn cmd_show(ecu: Option<String>, args: ReferenceArgs, csv: bool) -> Result<(), CliError> {
    let (_, table) = open(&args)?;
    let entries: Vec<&ReferenceEntry> = match &ecu {
        Some(name) => {
            let entry = table.get(name).ok_or_else(|| {
                CliError::args(format!("ECU '{name}' is not in the reference table"))
                    .with_hint("ECU names are matched exactly, including case")
            })?;
            vec![entry]
        }
        None => table.entries().iter().collect(),
    };

    let headers = table_headers(&table);
    let rows: Vec<Vec<String>> = entries.iter().map(|e| entry_row(e, &headers)).collect();
    if csv {
        let mut writer = ::csv::Writer::from_writer(std::io::stdout());
        let write = |w: &mut ::csv::Writer<std::io::Stdout>| -> Result<(), ::csv::Error> {
            w.write_record(&headers)?;
            for row in &rows {
                w.write_record(row)?;
            }
            w.flush()?;
            Ok(())
        };
        write(&mut writer).map_err(|e| ref_err(EXIT_ERROR, format!("cannot write to stdout: {e}")))?;
    } else {
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        print!("{}", render_table(&header_refs, &rows));
    }
    Ok(())
}

fn cmd_set(
    ecu: String,
    args: ReferenceArgs,
    part: Option<String>,
    sw: Option<String>,
    priority: Option<String>,
    owners: [Option<String>; 2],
) -> Result<(), CliError> {
    if ecu.trim().is_empty() {
        return Err(CliError::args(format!("{COL_ECU} name must not be empty")));
    }
    let priority = match priority {
        Some(raw) => match Priority::parse(&raw) {
            Priority::Unknown => {
                return Err(CliError::args(format!("invalid priority '{raw}' (expected 0, 1, 2 or 3)")));
            }
            p => Some(p),
        },
        None => None,
    };

    let (file, mut table) = open_or_create(&args)?;
    let existing = table.get(&ecu).cloned();
    if existing.is_none() && (part.is_none() || sw.is_none()) {
        return Err(CliError::args(format!("'{ecu}' is a new ECU; --part and --sw are required")));
    }

    let mut entry = existing.unwrap_or_else(|| ReferenceEntry::new(ecu.as_str(), "", "", Priority::Unknown));
    if let Some(part) = part {
        entry.part_number = part.trim().to_string();
    }
    if let Some(sw) = sw {
        entry.sw_version = sw.trim().to_string();
    }
    if let Some(priority) = priority {
        entry.priority = priority;
    }
    for (column, value) in OWNER_COLUMNS.iter().zip(owners) {
        if let Some(value) = value {
            entry = entry.with_owner(*column, value.trim());
        }
    }

    let replaced = table.upsert(entry).is_some();
    save(&file, &table)?;
    eprintln!(
        "{} '{ecu}' in {}",
        if replaced { "updated" } else { "added" },
        file.path().display()
    );
    Ok(())
}

/// Which records `adopt` applies, given the `--ecu` selection.
fn adoptable<'a>(
    records: &'a [EcuRecord],
    table: &ReferenceTable,
    selected: &BTreeSet<String>,
) -> Vec<&'a EcuRecord> {
    records
        .iter()
        .filter(|r| r.responded())
        .filter(|r| {
            if selected.is_empty() {
                table.get(&r.name).is_some()
            } else {
                selected.contains(&r.name)
            }
        })
        .collect()
}

/// Copy reported values into the table. Priority and owners of known ECUs are
/// kept; new ECUs get an unknown priority. Returns the adopted names.
fn adopt_records(table: &mut ReferenceTable, records: &[&EcuRecord]) -> Vec<String> {
    let mut adopted = Vec::new();
    for record in records {
        let mut entry = table
            .get(&record.name)
            .cloned()
            .unwrap_or_else(|| ReferenceEntry::new(record.name.as_str(), "", "", Priority::Unknown));
        if let Some(part) = &record.part_number {
            entry.part_number = part.clone();
        }
        if let Some(sw) = &record.sw_version {
            entry.sw_version = sw.clone();
        }
        table.upsert(entry);
        adopted.push(record.name.clone());
    }
    adopted
}

fn cmd_adopt(report: PathBuf, args: ReferenceArgs, ecus: Vec<String>, config: Option<PathBuf>) -> Result<(), CliError> {
    let settings = context::load_settings()?;
    let config = context::load_config(&settings, config.as_deref())?;
    let document = context::read_report(&report)?;
    let records = vsrcheck_recon::extract(&document, &config.extract);
    if records.is_empty() {
        return Err(ref_err(
            EXIT_NO_ECU_DATA,
            format!("no ECU data found in {}", context::report_name(&report)),
        ));
    }

    let (file, mut table) = open_or_create(&args)?;
    let selected: BTreeSet<String> = ecus.into_iter().collect();

    for name in &selected {
        match records.iter().find(|r| &r.name == name) {
            None => tracing::warn!(ecu = %name, "not in report, skipped"),
            Some(r) if !r.responded() => tracing::warn!(ecu = %name, "did not respond, skipped"),
            Some(_) => {}
        }
    }

    let chosen = adoptable(&records, &table, &selected);
    if chosen.is_empty() {
        return Err(CliError::args("nothing to adopt"));
    }
    let adopted = adopt_records(&mut table, &chosen);
    save(&file, &table)?;

    eprintln!("adopted {} ECU(s) into {}: {}", adopted.len(), file.path().display(), adopted.join(", "));
    Ok(())
}
