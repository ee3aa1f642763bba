//! Pull ECU rows out of a scan-report document.
//!
//! The report is an HTML page with an ECU information section. Rows come in two
//! shapes: a full diagnostic row (name, part number and software version at
//! fixed positions among at least eight cells) or a two-cell row whose second
//! cell says the ECU gave no positive response. Anything else is ignored.

use scraper::{ElementRef, Html, Selector};

use crate::config::ExtractConfig;
use crate::model::EcuRecord;

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Header cells that mark a table under the fallback heading as an ECU table.
const ECU_TABLE_HEADERS: [&str; 2] = ["ECU", "Part Number"];

/// Extract ECU records in document order.
///
/// A report without a recognizable table yields an empty vector. Callers
/// decide whether that is fatal.
pub fn extract(document: &str, config: &ExtractConfig) -> Vec<EcuRecord> {
    let html = Html::parse_document(document);

    let tables = locate_tables(&html, config);
    if tables.is_empty() {
        tracing::debug!(selector = %config.table_selector, "no ECU table in report");
        return Vec::new();
    }

    let marker = config.no_response_marker.to_lowercase();
    let mut records = Vec::new();

    for table in tables {
        for (row_idx, row) in table_rows(table).into_iter().enumerate().skip(1) {
            let cells = row_cells(row);

            if cells.len() == 2 && cells[1].to_lowercase().contains(&marker) {
                records.push(EcuRecord::no_response(cells[0].clone()));
            } else if let Some(record) = full_record(&cells, config) {
                records.push(record);
            } else {
                tracing::debug!(row = row_idx, cells = cells.len(), "skipping unrecognized row");
            }
        }
    }

    records
}

/// A full diagnostic row. `None` when the row is too short for the configured columns.
fn full_record(cells: &[String], config: &ExtractConfig) -> Option<EcuRecord> {
    if cells.len() < config.min_cells {
        return None;
    }
    Some(EcuRecord {
        name: cells.get(config.name_column)?.clone(),
        part_number: Some(cells.get(config.part_column)?.clone()),
        sw_version: Some(cells.get(config.sw_column)?.clone()),
    })
}

/// Find the ECU tables. The selector wins when it matches; otherwise every
/// top-level table between the fallback heading and the next heading of the
/// same or higher level whose header cells name an ECU or part number column.
fn locate_tables<'a>(html: &'a Html, config: &ExtractConfig) -> Vec<ElementRef<'a>> {
    // Validated configs always parse; an invalid one just finds nothing.
    if let Ok(selector) = Selector::parse(&config.table_selector) {
        if let Some(table) = html.select(&selector).next() {
            return vec![table];
        }
    }

    let wanted = config.heading_fallback.trim().to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let (Ok(heading_sel), Ok(table_sel)) = (Selector::parse(&HEADINGS.join(", ")), Selector::parse("table")) else {
        return Vec::new();
    };

    let Some(heading) = html
        .select(&heading_sel)
        .find(|h| element_text(*h).to_lowercase().contains(&wanted))
    else {
        return Vec::new();
    };
    let level = heading.value().name().to_string();
    tracing::debug!(heading = %level, "locating ECU tables by heading");

    let mut tables = Vec::new();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        let name = sibling.value().name();
        if HEADINGS.contains(&name) && name <= level.as_str() {
            break;
        }
        if name == "table" {
            tables.push(sibling);
        } else {
            tables.extend(sibling.select(&table_sel).filter(|t| !is_nested(*t, sibling)));
        }
    }

    tables.retain(|t| {
        let keep = has_ecu_headers(*t);
        if !keep {
            tracing::debug!("skipping table without ECU headers");
        }
        keep
    });
    tables
}

/// True when `table` sits inside another table below `within`.
fn is_nested(table: ElementRef<'_>, within: ElementRef<'_>) -> bool {
    table
        .ancestors()
        .take_while(|a| a.id() != within.id())
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "table")
}

/// True when one of the table's own `<th>` cells is exactly an ECU table header.
fn has_ecu_headers(table: ElementRef<'_>) -> bool {
    table_rows(table)
        .into_iter()
        .flat_map(|row| row.children().filter_map(ElementRef::wrap))
        .filter(|cell| cell.value().name() == "th")
        .map(element_text)
        .any(|text| ECU_TABLE_HEADERS.iter().any(|h| text.eq_ignore_ascii_case(h)))
}

/// Rows that belong to `table` itself, not to tables nested in its cells.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "td")
        .map(element_text)
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row(name: &str, part: &str, sw: &str) -> String {
        format!(
            "<tr><td>{name}</td><td>7E0</td><td>Yes</td><td>{part}</td><td>x</td><td>y</td><td>z</td><td>{sw}</td></tr>"
        )
    }

    fn report(rows: &[String]) -> String {
        format!(
            "<html><body><h1>Vehicle Scan Report</h1>\
             <table id=\"ecuInformation\">\
             <tr><th>ECU</th><th>Addr</th><th>Resp</th><th>Part Number</th>\
             <th>a</th><th>b</th><th>c</th><th>Application SW Version</th></tr>\
             {}</table></body></html>",
            rows.concat()
        )
    }

    #[test]
    fn extracts_full_and_no_response_rows() {
        let doc = report(&[
            full_row("BCM", "68400001AB", "20.05.01"),
            "<tr><td>TPMS</td><td>No Positive Response from ECU</td></tr>".into(),
        ]);
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(
            records,
            vec![
                EcuRecord::new("BCM", "68400001AB", "20.05.01"),
                EcuRecord::no_response("TPMS"),
            ]
        );
    }

    #[test]
    fn skips_header_and_odd_rows() {
        let doc = report(&[
            "<tr><td>partial</td><td>a</td><td>b</td></tr>".into(),
            "<tr><td>RFH</td><td>responded normally</td></tr>".into(),
            full_row("IPC", "68400003AA", "1.2.3"),
        ]);
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "IPC");
    }

    #[test]
    fn trims_cells_but_keeps_case() {
        let doc = report(&[full_row("  abs  ", "\n 68400004ab ", " v1.2.3 ")]);
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(records[0], EcuRecord::new("abs", "68400004ab", "v1.2.3"));
    }

    #[test]
    fn marker_is_case_insensitive() {
        let doc = report(&["<tr><td>SCCM</td><td>NO POSITIVE RESPONSE</td></tr>".into()]);
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(records, vec![EcuRecord::no_response("SCCM")]);
    }

    #[test]
    fn missing_table_is_empty() {
        let doc = "<html><body><p>nothing here</p></body></html>";
        assert!(extract(doc, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn header_only_table_is_empty() {
        assert!(extract(&report(&[]), &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn falls_back_to_heading() {
        let doc = format!(
            "<html><body>\
             <h2>Vehicle Information</h2><table><tr><th>VIN</th></tr><tr><td>1C4</td></tr></table>\
             <h2>ECU Information</h2>\
             <table><tr><th>ECU</th></tr>{}</table>\
             <h2>DTC Information</h2>\
             <table><tr><th>x</th></tr>{}</table>\
             </body></html>",
            full_row("BCM", "68400001AB", "1.0.0"),
            full_row("DTC", "P0001", "x"),
        );
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(records, vec![EcuRecord::new("BCM", "68400001AB", "1.0.0")]);
    }

    #[test]
    fn heading_fallback_skips_tables_without_ecu_headers() {
        let doc = format!(
            "<html><body><h2>ECU Information</h2>\
             <table><tr><th>Code</th><th>Meaning</th></tr>\
             <tr><td>NPR</td><td>No Positive Response</td></tr></table>\
             <div><table><tr><th>ECU</th><th>Addr</th></tr>{}</table></div>\
             <table><tr><th>Part Number</th></tr>{}</table>\
             <h2>DTC Information</h2></body></html>",
            full_row("BCM", "68400001AB", "1.0.0"),
            "<tr><td>TPMS</td><td>No Positive Response</td></tr>",
        );
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(
            records,
            vec![EcuRecord::new("BCM", "68400001AB", "1.0.0"), EcuRecord::no_response("TPMS")]
        );
    }

    #[test]
    fn ecu_header_must_match_whole_cell() {
        let doc = format!(
            "<html><body><h2>ECU Information</h2>\
             <table><tr><th>Secure ECU count</th></tr>{}</table></body></html>",
            full_row("BCM", "68400001AB", "1.0.0"),
        );
        assert!(extract(&doc, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn heading_fallback_stops_at_next_section() {
        let doc = format!(
            "<html><body><h2>ECU Information</h2><p>none</p>\
             <h2>DTC Information</h2><table><tr><th>x</th></tr>{}</table></body></html>",
            full_row("DTC", "P0001", "x"),
        );
        assert!(extract(&doc, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn nested_table_rows_are_not_ecus() {
        let doc = report(&[format!(
            "<tr><td>GW</td><td>No Positive Response<table><tr><td>h</td></tr>{}</table></td></tr>",
            full_row("INNER", "X", "1.0.0")
        )]);
        let records = extract(&doc, &ExtractConfig::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "GW");
        assert!(!records[0].responded());
    }

    #[test]
    fn custom_columns() {
        let config = ExtractConfig {
            table_selector: "table.ecus".into(),
            part_column: 1,
            sw_column: 2,
            min_cells: 3,
            ..ExtractConfig::default()
        };
        let doc = "<table class=\"ecus\"><tr><th>h</th></tr>\
                   <tr><td>BCM</td><td>68400001AA</td><td>1.0.0</td></tr></table>";
        assert_eq!(extract(doc, &config), vec![EcuRecord::new("BCM", "68400001AA", "1.0.0")]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = report(&[
            full_row("BCM", "68400001AB", "20.05.01"),
            "<tr><td>TPMS</td><td>No Positive Response</td></tr>".into(),
            full_row("IPC", "68400003AA", "1.2.3"),
        ]);
        let config = ExtractConfig::default();
        assert_eq!(extract(&doc, &config), extract(&doc, &config));
    }
}
