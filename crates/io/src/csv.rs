// CSV import/export for reference tables and results

use std::io::{Read, Write};
use std::path::Path;

use vsrcheck_recon::model::{display_or_na, ClassificationResult, ReferenceTable};

use crate::error::{IoError, IoResult};
use crate::reference::{entry_row, table_from_rows, table_headers, OWNER_COLUMNS};

/// Column headers of the flat results export.
pub const RESULT_HEADERS: [&str; 10] = [
    "ECU",
    "Reported Part #",
    "Expected Part #",
    "Part Status",
    "Reported SW",
    "Expected SW",
    "SW Status",
    "Priority",
    "FI Owner",
    "Subsystem Owner",
];

/// Flatten one result into cells matching [`RESULT_HEADERS`].
pub fn result_cells(r: &ClassificationResult) -> Vec<String> {
    let mut cells = vec![
        r.ecu.clone(),
        display_or_na(r.reported_part.as_deref()).to_string(),
        display_or_na(r.expected_part.as_deref()).to_string(),
        r.part_status.label().to_string(),
        display_or_na(r.reported_sw.as_deref()).to_string(),
        display_or_na(r.expected_sw.as_deref()).to_string(),
        r.sw_status.label().to_string(),
        r.priority.to_string(),
    ];
    cells.extend(OWNER_COLUMNS.iter().map(|c| r.owner(c).to_string()));
    cells
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> IoResult<String> {
    let read_err = |source| IoError::Read { path: path.to_path_buf(), source };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) if s.starts_with('\u{feff}') => Ok(s['\u{feff}'.len_utf8()..].to_string()),
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs and older scan tools)
            tracing::debug!(path = %path.display(), "decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Load a reference table from a delimited text file.
pub fn read_reference(path: &Path) -> IoResult<ReferenceTable> {
    let content = read_file_as_utf8(path)?;
    reference_from_str(&path.display().to_string(), &content)
}

pub fn reference_from_str(source_name: &str, content: &str) -> IoResult<ReferenceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;

    table_from_rows(source_name, &headers, rows)
}

/// Delimiter for writing `path`: the one the existing file uses, else tab
/// for `.tsv` and comma otherwise.
fn output_delimiter(path: &Path) -> u8 {
    if let Ok(content) = read_file_as_utf8(path) {
        if content.lines().next().is_some_and(|l| !l.trim().is_empty()) {
            return sniff_delimiter(&content);
        }
    }
    let tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    if tsv {
        b'\t'
    } else {
        b','
    }
}

/// Write a reference table as delimited text, keeping the column layout and
/// delimiter of the file it replaces.
pub fn write_reference(path: &Path, table: &ReferenceTable) -> IoResult<()> {
    let delimiter = output_delimiter(path);
    let file = std::fs::File::create(path).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(file);
    let headers = table_headers(table);
    writer.write_record(&headers)?;
    for entry in table.entries() {
        writer.write_record(entry_row(entry, &headers))?;
    }
    writer.flush().map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Write classification results as CSV.
pub fn write_results<W: Write>(out: W, results: &[ClassificationResult]) -> IoResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(RESULT_HEADERS)?;
    for r in results {
        writer.write_record(result_cells(r))?;
    }
    writer.flush().map_err(|e| IoError::Csv(e.into()))?;
    Ok(())
}

pub fn write_results_file(path: &Path, results: &[ClassificationResult]) -> IoResult<()> {
    let file = std::fs::File::create(path).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_results(file, results)
}
