use std::collections::{BTreeMap, HashMap};

use serde::{Serialize, Serializer};

/// Literal used wherever a value is absent: no positive response from the
/// ECU, or no entry in the reference table.
pub const NOT_AVAILABLE: &str = "N/A";

/// True when a reported or expected value carries no comparable content.
pub fn is_missing(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            v.is_empty() || v == NOT_AVAILABLE
        }
    }
}

/// Render an optional value the way every export shows it.
pub fn display_or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

fn serialize_or_na<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(display_or_na(value.as_deref()))
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One ECU row pulled out of a scan report.
///
/// `None` means the ECU did not answer the scan. It is not the same thing as
/// the ECU being unknown to the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EcuRecord {
    pub name: String,
    #[serde(serialize_with = "serialize_or_na")]
    pub part_number: Option<String>,
    #[serde(serialize_with = "serialize_or_na")]
    pub sw_version: Option<String>,
}

impl EcuRecord {
    pub fn new(name: impl Into<String>, part_number: impl Into<String>, sw_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_number: Some(part_number.into()),
            sw_version: Some(sw_version.into()),
        }
    }

    pub fn no_response(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part_number: None,
            sw_version: None,
        }
    }

    pub fn responded(&self) -> bool {
        self.part_number.is_some() || self.sw_version.is_some()
    }
}

// ---------------------------------------------------------------------------
// Reference table
// ---------------------------------------------------------------------------

/// Remediation priority assigned by the reference table owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    #[default]
    Unknown,
}

impl Priority {
    /// Parse a priority cell. Spreadsheet cells often come back as `1.0`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let level = raw
            .parse::<u8>()
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && (0.0..=3.0).contains(f))
                    .map(|f| f as u8)
            });
        match level {
            Some(0) => Self::P0,
            Some(1) => Self::P1,
            Some(2) => Self::P2,
            Some(3) => Self::P3,
            _ => Self::Unknown,
        }
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            Self::P0 => Some(0),
            Self::P1 => Some(1),
            Self::P2 => Some(2),
            Self::P3 => Some(3),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level() {
            Some(level) => write!(f, "{level}"),
            None => write!(f, "{NOT_AVAILABLE}"),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.level() {
            Some(level) => s.serialize_u8(level),
            None => s.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// Expected identity of one ECU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub ecu: String,
    pub part_number: String,
    pub sw_version: String,
    pub priority: Priority,
    /// Ownership columns, carried through untouched.
    pub owner_fields: BTreeMap<String, String>,
    /// Source columns the engine does not read, keyed by header. Written back as-is.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fields: BTreeMap<String, String>,
}

impl ReferenceEntry {
    pub fn new(
        ecu: impl Into<String>,
        part_number: impl Into<String>,
        sw_version: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            ecu: ecu.into(),
            part_number: part_number.into(),
            sw_version: sw_version.into(),
            priority,
            owner_fields: BTreeMap::new(),
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.owner_fields.insert(column.into(), value.into());
        self
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_fields.insert(column.into(), value.into());
        self
    }
}

/// The master table, keyed by exact ECU name. Row order is kept so the table
/// can be written back the way it was read.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
    columns: Vec<String>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows. When a name repeats, the first row wins and
    /// the name is recorded in [`ReferenceTable::duplicates`].
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            if table.index.contains_key(&entry.ecu) {
                tracing::warn!(ecu = %entry.ecu, "duplicate reference entry ignored");
                table.duplicates.push(entry.ecu);
                continue;
            }
            table.index.insert(entry.ecu.clone(), table.entries.len());
            table.entries.push(entry);
        }
        table
    }

    /// Record the source header row, in order.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Header row of the source file. Empty for tables built in memory.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, ecu: &str) -> Option<&ReferenceEntry> {
        self.index.get(ecu).map(|&i| &self.entries[i])
    }

    /// Insert or replace the entry for `entry.ecu`. Returns the replaced entry.
    pub fn upsert(&mut self, entry: ReferenceEntry) -> Option<ReferenceEntry> {
        match self.index.get(&entry.ecu) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], entry)),
            None => {
                self.index.insert(entry.ecu.clone(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Names that appeared more than once in the source rows.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Match,
    Older,
    Newer,
    NotFound,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Match, Status::Older, Status::Newer, Status::NotFound];

    /// Older and missing values both call for a reflash.
    pub fn needs_update(&self) -> bool {
        matches!(self, Self::Older | Self::NotFound)
    }

    /// Column label used in tabular exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Match => "Match",
            Self::Older => "Older",
            Self::Newer => "Newer",
            Self::NotFound => "Not Found",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Older => write!(f, "older"),
            Self::Newer => write!(f, "newer"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "match" => Ok(Self::Match),
            "older" => Ok(Self::Older),
            "newer" => Ok(Self::Newer),
            "not_found" | "notfound" => Ok(Self::NotFound),
            other => Err(format!("unknown status '{other}' (expected match, older, newer or not_found)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub ecu: String,
    #[serde(serialize_with = "serialize_or_na")]
    pub reported_part: Option<String>,
    #[serde(serialize_with = "serialize_or_na")]
    pub expected_part: Option<String>,
    pub part_status: Status,
    #[serde(serialize_with = "serialize_or_na")]
    pub reported_sw: Option<String>,
    #[serde(serialize_with = "serialize_or_na")]
    pub expected_sw: Option<String>,
    pub sw_status: Status,
    pub priority: Priority,
    pub owner_fields: BTreeMap<String, String>,
}

impl ClassificationResult {
    pub fn needs_update(&self) -> bool {
        self.part_status.needs_update() || self.sw_status.needs_update()
    }

    pub fn has_not_found(&self) -> bool {
        self.part_status == Status::NotFound || self.sw_status == Status::NotFound
    }

    pub fn owner(&self, column: &str) -> &str {
        self.owner_fields
            .get(column)
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }
}

// ---------------------------------------------------------------------------
// Remediation
// ---------------------------------------------------------------------------

/// ECUs that need attention, grouped by reference priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemediationPlan {
    pub priority_1: Vec<ClassificationResult>,
    pub priority_2: Vec<ClassificationResult>,
    pub priority_3: Vec<ClassificationResult>,
    /// Priority 0 ECUs that are current.
    pub other_no_update: Vec<String>,
    /// ECUs with any `NotFound` status. Overlaps the priority buckets.
    pub missing: Vec<String>,
    /// Priority 0 ECUs that are behind. Not escalated.
    pub deferred: Vec<String>,
}

impl RemediationPlan {
    pub fn update_count(&self) -> usize {
        self.priority_1.len() + self.priority_2.len() + self.priority_3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.update_count() == 0 && self.missing.is_empty() && self.deferred.is_empty()
    }

    /// Priority buckets in escalation order, paired with their level.
    pub fn buckets(&self) -> [(u8, &[ClassificationResult]); 3] {
        [
            (1, self.priority_1.as_slice()),
            (2, self.priority_2.as_slice()),
            (3, self.priority_3.as_slice()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub matched: usize,
    pub older: usize,
    pub newer: usize,
    pub not_found: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Match => self.matched += 1,
            Status::Older => self.older += 1,
            Status::Newer => self.newer += 1,
            Status::NotFound => self.not_found += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_ecus: usize,
    pub no_response: usize,
    pub needs_update: usize,
    pub part: StatusCounts,
    pub sw: StatusCounts,
}

impl ReconSummary {
    /// Anything other than a full match on both fields.
    pub fn has_mismatches(&self) -> bool {
        self.part.matched < self.total_ecus || self.sw.matched < self.total_ecus
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub report: String,
    pub reference_entries: usize,
    pub extracted_ecus: usize,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub results: Vec<ClassificationResult>,
    pub plan: RemediationPlan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_text_and_float_cells() {
        assert_eq!(Priority::parse("1"), Priority::P1);
        assert_eq!(Priority::parse(" 3 "), Priority::P3);
        assert_eq!(Priority::parse("2.0"), Priority::P2);
        assert_eq!(Priority::parse("0"), Priority::P0);
        assert_eq!(Priority::parse("4"), Priority::Unknown);
        assert_eq!(Priority::parse("1.5"), Priority::Unknown);
        assert_eq!(Priority::parse("N/A"), Priority::Unknown);
        assert_eq!(Priority::parse(""), Priority::Unknown);
    }

    #[test]
    fn missing_covers_sentinel_and_blank() {
        assert!(is_missing(None));
        assert!(is_missing(Some("")));
        assert!(is_missing(Some("   ")));
        assert!(is_missing(Some("N/A")));
        assert!(!is_missing(Some("68500123AB")));
    }

    #[test]
    fn reference_table_keeps_first_duplicate() {
        let table = ReferenceTable::from_entries(vec![
            ReferenceEntry::new("BCM", "68400001AA", "1.0.0", Priority::P1),
            ReferenceEntry::new("BCM", "68400001AB", "2.0.0", Priority::P2),
            ReferenceEntry::new("RFH", "68400002AA", "1.0.0", Priority::P3),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("BCM").map(|e| e.part_number.as_str()), Some("68400001AA"));
        assert_eq!(table.duplicates(), ["BCM".to_string()]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let table = ReferenceTable::from_entries(vec![ReferenceEntry::new("BCM", "AA", "1.0.0", Priority::P1)]);
        assert!(table.get("bcm").is_none());
        assert!(table.get("BCM").is_some());
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut table = ReferenceTable::from_entries(vec![
            ReferenceEntry::new("BCM", "68400001AA", "1.0.0", Priority::P1),
            ReferenceEntry::new("RFH", "68400002AA", "1.0.0", Priority::P3),
        ]);
        let old = table.upsert(ReferenceEntry::new("BCM", "68400001AC", "1.1.0", Priority::P1));
        assert_eq!(old.map(|e| e.part_number), Some("68400001AA".to_string()));
        assert_eq!(table.entries()[0].part_number, "68400001AC");

        assert!(table.upsert(ReferenceEntry::new("IPC", "68400003AA", "4.0.0", Priority::P2)).is_none());
        assert_eq!(table.entries().last().map(|e| e.ecu.as_str()), Some("IPC"));
    }

    #[test]
    fn status_round_trips_through_cli_spelling() {
        for status in Status::ALL {
            assert_eq!(status.to_string().parse::<Status>(), Ok(status));
        }
        assert_eq!("Not Found".parse::<Status>(), Ok(Status::NotFound));
        assert!("stale".parse::<Status>().is_err());
    }

    #[test]
    fn records_serialize_sentinel() {
        let json = serde_json::to_value(EcuRecord::no_response("TPMS")).unwrap();
        assert_eq!(json["part_number"], "N/A");
        assert_eq!(json["sw_version"], "N/A");
    }
}
