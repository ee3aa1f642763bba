//! Reference (master) table ports.
//!
//! The engine only ever sees a [`ReferenceTable`]. Loading it and writing it
//! back are the job of a [`ReferenceSource`] / [`ReferenceSink`]; the file
//! backed implementation handles CSV and spreadsheet workbooks.

use std::path::{Path, PathBuf};

use vsrcheck_recon::compare::{revision_suffix, version_core, SwVersion};
use vsrcheck_recon::model::{Priority, ReferenceEntry, ReferenceTable};

use crate::error::{IoError, IoResult};

pub const COL_ECU: &str = "ECU";
pub const COL_PART: &str = "Part #";
pub const COL_SW: &str = "SW Version";
pub const COL_PRIORITY: &str = "Priority";
pub const OWNER_COLUMNS: [&str; 2] = ["FI Owner", "Subsystem Owner"];

/// Sheet preferred when a workbook holds several.
pub const DEFAULT_SHEET: &str = "Master SW List";

/// Read port for the master table.
pub trait ReferenceSource {
    fn load(&self) -> IoResult<ReferenceTable>;
}

/// Write port for the master table.
pub trait ReferenceSink {
    fn save(&self, table: &ReferenceTable) -> IoResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFormat {
    Csv,
    Workbook,
}

impl ReferenceFormat {
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            _ => Err(IoError::Unsupported(format!(
                "{}: unsupported reference format (expected .csv, .xlsx, .xls or .ods)",
                path.display()
            ))),
        }
    }
}

/// A reference table stored in a local file.
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    path: PathBuf,
    format: ReferenceFormat,
    sheet: Option<String>,
}

impl ReferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> IoResult<Self> {
        let path = path.into();
        let format = ReferenceFormat::from_path(&path)?;
        Ok(Self { path, format, sheet: None })
    }

    /// Pick a worksheet by name (workbooks only).
    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ReferenceFormat {
        self.format
    }
}

impl ReferenceSource for ReferenceFile {
    fn load(&self) -> IoResult<ReferenceTable> {
        let table = match self.format {
            ReferenceFormat::Csv => crate::csv::read_reference(&self.path)?,
            ReferenceFormat::Workbook => crate::xlsx::read_reference(&self.path, self.sheet.as_deref())?,
        };
        tracing::info!(path = %self.path.display(), entries = table.len(), "loaded reference table");
        Ok(table)
    }
}

impl ReferenceSink for ReferenceFile {
    /// Write the table back in its source layout. Columns the engine does not
    /// use are kept, and so are the other sheets of a workbook. A table whose
    /// source had duplicate rows is refused, since only the first row was kept.
    fn save(&self, table: &ReferenceTable) -> IoResult<()> {
        if !table.duplicates().is_empty() {
            let mut ecus: Vec<String> = Vec::new();
            for ecu in table.duplicates() {
                if !ecus.contains(ecu) {
                    ecus.push(ecu.clone());
                }
            }
            return Err(IoError::DuplicateRows { path: self.path.clone(), ecus });
        }
        match self.format {
            ReferenceFormat::Csv => crate::csv::write_reference(&self.path, table),
            ReferenceFormat::Workbook => {
                let writable = self
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
                if !writable {
                    return Err(IoError::Unsupported(format!(
                        "{}: only .xlsx and .csv reference tables can be written",
                        self.path.display()
                    )));
                }
                crate::xlsx::write_reference(&self.path, table, self.sheet.as_deref())
            }
        }?;
        tracing::info!(path = %self.path.display(), entries = table.len(), "saved reference table");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn same_column(header: &str, name: &str) -> bool {
    header.trim().to_lowercase() == name.to_lowercase()
}

/// Key for a column the engine does not use: its trimmed header, or its
/// position when the header cell is blank.
fn extra_key(index: usize, header: &str) -> String {
    let header = header.trim();
    if header.is_empty() {
        format!("Column {}", index + 1)
    } else {
        header.to_string()
    }
}

/// Map each header position to the standard column it holds. Only the first
/// header matching a standard name counts; later ones are extra columns.
fn standard_columns(headers: &[String]) -> Vec<Option<&'static str>> {
    let mut taken: Vec<&'static str> = Vec::new();
    headers
        .iter()
        .map(|header| {
            let name = reference_headers()
                .into_iter()
                .find(|name| same_column(header, name) && !taken.contains(name))?;
            taken.push(name);
            Some(name)
        })
        .collect()
}

/// Build a table from a header row and string rows.
///
/// Headers are matched trimmed and case-insensitively. `ECU`, `Part #` and
/// `SW Version` are required; `Priority` and the owner columns are optional.
/// Any other column is kept in [`ReferenceEntry::extra_fields`]. Rows without
/// an ECU name are skipped.
pub fn table_from_rows<I>(source_name: &str, headers: &[String], rows: I) -> IoResult<ReferenceTable>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let layout = standard_columns(headers);
    let find = |name: &str| layout.iter().position(|c| *c == Some(name));
    let require = |name: &str| {
        find(name).ok_or_else(|| IoError::MissingColumn {
            source_name: source_name.to_string(),
            column: name.to_string(),
        })
    };

    let ecu_col = require(COL_ECU)?;
    let part_col = require(COL_PART)?;
    let sw_col = require(COL_SW)?;
    let priority_col = find(COL_PRIORITY);
    let owner_cols: Vec<(&str, usize)> = OWNER_COLUMNS
        .iter()
        .filter_map(|&name| find(name).map(|i| (name, i)))
        .collect();
    let extra_cols: Vec<(String, usize)> = layout
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_none())
        .map(|(i, _)| (extra_key(i, &headers[i]), i))
        .collect();

    let mut entries = Vec::new();
    for (row_idx, row) in rows.into_iter().enumerate() {
        let cell = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");

        let ecu = cell(ecu_col);
        if ecu.is_empty() {
            if row.iter().any(|c| !c.trim().is_empty()) {
                tracing::warn!(source = source_name, row = row_idx + 2, "reference row without ECU name skipped");
            }
            continue;
        }

        let mut entry = ReferenceEntry::new(
            ecu,
            cell(part_col),
            cell(sw_col),
            priority_col.map(|i| Priority::parse(cell(i))).unwrap_or_default(),
        );
        for &(name, i) in &owner_cols {
            let value = cell(i);
            if !value.is_empty() {
                entry = entry.with_owner(name, value);
            }
        }
        for (key, i) in &extra_cols {
            let value = cell(*i);
            if !value.is_empty() {
                entry = entry.with_extra(key.as_str(), value);
            }
        }
        entries.push(entry);
    }

    Ok(ReferenceTable::from_entries(entries).with_columns(headers.to_vec()))
}

/// Standard header row, used for tables that have no source layout.
pub fn reference_headers() -> Vec<&'static str> {
    let mut headers = vec![COL_ECU, COL_PART, COL_SW, COL_PRIORITY];
    headers.extend(OWNER_COLUMNS);
    headers
}

/// Header row to write for `table`: the source layout, followed by any
/// standard or extra column that entries now carry but the source lacked.
pub fn table_headers(table: &ReferenceTable) -> Vec<String> {
    let mut headers: Vec<String> = if table.columns().is_empty() {
        reference_headers().into_iter().map(str::to_string).collect()
    } else {
        table.columns().to_vec()
    };

    let entries = table.entries();
    for name in reference_headers() {
        let needed = match name {
            COL_ECU | COL_PART | COL_SW => true,
            COL_PRIORITY => entries.iter().any(|e| e.priority != Priority::Unknown),
            owner => entries.iter().any(|e| e.owner_fields.get(owner).is_some_and(|v| !v.is_empty())),
        };
        if needed && !headers.iter().any(|h| same_column(h, name)) {
            headers.push(name.to_string());
        }
    }

    for entry in entries {
        for key in entry.extra_fields.keys() {
            let present = headers.iter().enumerate().any(|(i, h)| extra_key(i, h) == *key);
            if !present {
                headers.push(key.clone());
            }
        }
    }
    headers
}

/// Cells of `entry` laid out under `headers` (from [`table_headers`]).
pub fn entry_row(entry: &ReferenceEntry, headers: &[String]) -> Vec<String> {
    standard_columns(headers)
        .into_iter()
        .enumerate()
        .map(|(i, column)| match column {
            Some(COL_ECU) => entry.ecu.clone(),
            Some(COL_PART) => entry.part_number.clone(),
            Some(COL_SW) => entry.sw_version.clone(),
            Some(COL_PRIORITY) => entry.priority.level().map(|l| l.to_string()).unwrap_or_default(),
            Some(owner) => entry.owner_fields.get(owner).cloned().unwrap_or_default(),
            None => entry.extra_fields.get(&extra_key(i, &headers[i])).cloned().unwrap_or_default(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Table audit
// ---------------------------------------------------------------------------

/// Data-quality problem in a reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    DuplicateEcu(String),
    EmptyPartNumber(String),
    ShortPartNumber { ecu: String, value: String },
    EmptySwVersion(String),
    UnparseableSwVersion { ecu: String, value: String },
    UnknownPriority(String),
}

impl std::fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEcu(ecu) => write!(f, "{ecu}: duplicate entry (first row is used)"),
            Self::EmptyPartNumber(ecu) => write!(f, "{ecu}: part number is empty"),
            Self::ShortPartNumber { ecu, value } => {
                write!(f, "{ecu}: part number '{value}' has no revision suffix")
            }
            Self::EmptySwVersion(ecu) => write!(f, "{ecu}: software version is empty"),
            Self::UnparseableSwVersion { ecu, value } => {
                write!(f, "{ecu}: software version '{value}' is not a version number")
            }
            Self::UnknownPriority(ecu) => write!(f, "{ecu}: priority missing or not 0-3 (treated as 1)"),
        }
    }
}

/// List everything in `table` that will make comparisons fall back to
/// `NotFound`/`Older` or escalate priority by default.
pub fn audit(table: &ReferenceTable) -> Vec<ReferenceIssue> {
    let mut issues: Vec<ReferenceIssue> = table
        .duplicates()
        .iter()
        .cloned()
        .map(ReferenceIssue::DuplicateEcu)
        .collect();

    for entry in table.entries() {
        let ecu = entry.ecu.clone();
        if entry.part_number.trim().is_empty() {
            issues.push(ReferenceIssue::EmptyPartNumber(ecu.clone()));
        } else if revision_suffix(&entry.part_number).is_none() {
            issues.push(ReferenceIssue::ShortPartNumber {
                ecu: ecu.clone(),
                value: entry.part_number.clone(),
            });
        }

        if entry.sw_version.trim().is_empty() {
            issues.push(ReferenceIssue::EmptySwVersion(ecu.clone()));
        } else if SwVersion::parse(version_core(&entry.sw_version)).is_none() {
            issues.push(ReferenceIssue::UnparseableSwVersion {
                ecu: ecu.clone(),
                value: entry.sw_version.clone(),
            });
        }

        if entry.priority == Priority::Unknown {
            issues.push(ReferenceIssue::UnknownPriority(ecu));
        }
    }

    issues
}
