use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration. Every field has a default, so an empty TOML document
/// is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconConfig {
    pub extract: ExtractConfig,
    pub compare: ComparePolicy,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Where the ECU table lives in a scan report and how its rows are laid out.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// CSS selector for the ECU information table.
    pub table_selector: String,
    /// Heading text searched when the selector matches nothing.
    /// Empty disables the fallback.
    pub heading_fallback: String,
    /// Phrase in the second cell of a two-cell row meaning the ECU did not answer.
    pub no_response_marker: String,
    pub name_column: usize,
    pub part_column: usize,
    pub sw_column: usize,
    /// Rows with fewer cells than this (and not a no-response row) are skipped.
    pub min_cells: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            table_selector: "table#ecuInformation".into(),
            heading_fallback: "ECU Information".into(),
            no_response_marker: "No Positive Response".into(),
            name_column: 0,
            part_column: 3,
            sw_column: 7,
            min_cells: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComparePolicy {
    pub short_part: ShortPartPolicy,
    pub unparseable_version: UnparseablePolicy,
}

/// Outcome for part numbers too short to carry a two-character revision suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortPartPolicy {
    /// No revision suffix to compare.
    #[default]
    NotFound,
    /// Compare whatever suffix exists; two short values with equal suffixes match.
    Match,
}

/// Outcome when either software version cannot be read as a version number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseablePolicy {
    #[default]
    Older,
    NotFound,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let extract = &self.extract;

        if extract.table_selector.trim().is_empty() {
            return Err(ReconError::ConfigValidation("extract.table_selector must not be empty".into()));
        }
        scraper::Selector::parse(&extract.table_selector).map_err(|e| {
            ReconError::ConfigValidation(format!(
                "extract.table_selector '{}' is not a valid selector: {e}",
                extract.table_selector
            ))
        })?;

        if extract.no_response_marker.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "extract.no_response_marker must not be empty".into(),
            ));
        }

        let widest = extract
            .name_column
            .max(extract.part_column)
            .max(extract.sw_column);
        if extract.min_cells <= widest {
            return Err(ReconError::ConfigValidation(format!(
                "extract.min_cells ({}) must exceed the highest column index ({widest})",
                extract.min_cells
            )));
        }

        // Two-cell rows are reserved for the no-response form.
        if extract.min_cells <= 2 {
            return Err(ReconError::ConfigValidation(
                "extract.min_cells must be at least 3".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.extract.part_column, 3);
        assert_eq!(config.extract.sw_column, 7);
        assert_eq!(config.compare.short_part, ShortPartPolicy::NotFound);
        assert_eq!(config.compare.unparseable_version, UnparseablePolicy::Older);
    }

    #[test]
    fn partial_override() {
        let config = ReconConfig::from_toml(
            r#"
[extract]
table_selector = "table.ecu-list"
no_response_marker = "No Response"

[compare]
short_part = "match"
unparseable_version = "not_found"
"#,
        )
        .unwrap();
        assert_eq!(config.extract.table_selector, "table.ecu-list");
        assert_eq!(config.extract.min_cells, 8);
        assert_eq!(config.compare.short_part, ShortPartPolicy::Match);
        assert_eq!(config.compare.unparseable_version, UnparseablePolicy::NotFound);
    }

    #[test]
    fn rejects_bad_selector() {
        let err = ReconConfig::from_toml("[extract]\ntable_selector = \"table[[\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)), "{err}");
    }

    #[test]
    fn rejects_column_beyond_min_cells() {
        let err = ReconConfig::from_toml("[extract]\nsw_column = 9\n").unwrap_err();
        assert!(err.to_string().contains("min_cells"), "{err}");
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = ReconConfig::from_toml("[compare]\nshort_part = \"maybe\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
