// Excel import/export: reference workbooks and styled result reports

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_xlsxwriter::{Color, Format, FormatBorder, Formula, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use vsrcheck_recon::model::{ClassificationResult, ReconResult, ReferenceTable, Status};

use crate::csv::{result_cells, RESULT_HEADERS};
use crate::error::{IoError, IoResult};
use crate::reference::{entry_row, table_from_rows, table_headers, DEFAULT_SHEET};

fn xlsx_err(e: XlsxError) -> IoError {
    IoError::Workbook(e.to_string())
}

/// Cell text as a person would read it in Excel. Whole floats lose their
/// `.0` so priorities and numeric part numbers compare as typed.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reference workbook
// ---------------------------------------------------------------------------

/// Load a reference table from a workbook (xlsx, xlsm, xlsb, xls, ods).
///
/// With no sheet named, `Master SW List` is used when present, else the
/// first sheet.
pub fn read_reference(path: &Path, sheet: Option<&str>) -> IoResult<ReferenceTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IoError::Workbook(format!("failed to open {}: {e}", path.display())))?;

    let names = workbook.sheet_names().to_vec();
    let chosen = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IoError::SheetNotFound {
                sheet: wanted.to_string(),
                available: names.clone(),
            })?,
        None => default_sheet(&names)
            .map(str::to_string)
            .ok_or_else(|| IoError::Workbook(format!("{} contains no sheets", path.display())))?,
    };
    tracing::debug!(sheet = %chosen, "reading reference sheet");

    let range = workbook
        .worksheet_range(&chosen)
        .map_err(|e| IoError::Workbook(format!("failed to read sheet '{chosen}': {e}")))?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    table_from_rows(&format!("{} [{chosen}]", path.display()), &headers, rows)
}

fn default_sheet(names: &[String]) -> Option<&str> {
    names
        .iter()
        .find(|n| n.as_str() == DEFAULT_SHEET)
        .or_else(|| names.first())
        .map(String::as_str)
}

/// A worksheet carried over unchanged when the reference sheet is rewritten.
struct KeptSheet {
    name: String,
    values: Range<Data>,
    formulas: Range<String>,
}

enum SheetSlot {
    Reference(String),
    Kept(KeptSheet),
}

/// Sheets of the workbook at `path` in order, with the reference sheet picked
/// the way [`read_reference`] picks it. A missing file gets one new sheet.
fn existing_layout(path: &Path, sheet: Option<&str>) -> IoResult<Vec<SheetSlot>> {
    if !path.exists() {
        let name = sheet.unwrap_or(DEFAULT_SHEET);
        return Ok(vec![SheetSlot::Reference(name.to_string())]);
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IoError::Workbook(format!("failed to open {}: {e}", path.display())))?;
    let names = workbook.sheet_names().to_vec();
    let target = match sheet {
        Some(wanted) => wanted.to_string(),
        None => default_sheet(&names).unwrap_or(DEFAULT_SHEET).to_string(),
    };

    let mut slots = Vec::with_capacity(names.len() + 1);
    for name in &names {
        if *name == target {
            slots.push(SheetSlot::Reference(target.clone()));
            continue;
        }
        let read_err = |e: calamine::Error| IoError::Workbook(format!("failed to read sheet '{name}': {e}"));
        let values = workbook.worksheet_range(name).map_err(read_err)?;
        let formulas = workbook.worksheet_formula(name).map_err(read_err)?;
        slots.push(SheetSlot::Kept(KeptSheet {
            name: name.clone(),
            values,
            formulas,
        }));
    }
    if !names.contains(&target) {
        slots.push(SheetSlot::Reference(target));
    }
    Ok(slots)
}

/// Write a reference table to an xlsx workbook.
///
/// When the file exists, only the reference sheet is replaced. Other sheets
/// keep their values and formulas but not their cell formatting.
pub fn write_reference(path: &Path, table: &ReferenceTable, sheet: Option<&str>) -> IoResult<()> {
    let slots = existing_layout(path, sheet)?;
    let mut workbook = XlsxWorkbook::new();

    for slot in &slots {
        let worksheet = workbook.add_worksheet();
        match slot {
            SheetSlot::Reference(name) => write_reference_sheet(worksheet, name, table)?,
            SheetSlot::Kept(kept) => write_kept_sheet(worksheet, kept)?,
        }
    }

    let kept = slots.iter().filter(|s| matches!(s, SheetSlot::Kept(_))).count();
    if kept > 0 {
        tracing::warn!(path = %path.display(), sheets = kept, "other sheets rewritten without cell formatting");
    }
    workbook.save(path).map_err(xlsx_err)
}

fn write_reference_sheet(worksheet: &mut Worksheet, name: &str, table: &ReferenceTable) -> IoResult<()> {
    worksheet.set_name(name).map_err(xlsx_err)?;
    let header = header_format();

    let headers = table_headers(table);
    write_row(worksheet, 0, headers.iter().cloned(), Some(&header))?;
    for (i, entry) in table.entries().iter().enumerate() {
        write_row(worksheet, i as u32 + 1, entry_row(entry, &headers), None)?;
    }
    size_columns(worksheet, headers.len())?;
    worksheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
    Ok(())
}

fn write_kept_sheet(worksheet: &mut Worksheet, kept: &KeptSheet) -> IoResult<()> {
    worksheet.set_name(&kept.name).map_err(xlsx_err)?;
    let date = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    if let Some((row0, col0)) = kept.values.start() {
        for (r, c, value) in kept.values.used_cells() {
            let (row, col) = (row0 + r as u32, (col0 as usize + c) as u16);
            write_kept_value(worksheet, row, col, value, &date)?;
        }
    }
    // Formulas go last so they replace the cached values written above.
    if let Some((row0, col0)) = kept.formulas.start() {
        for (r, c, formula) in kept.formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let (row, col) = (row0 + r as u32, (col0 as usize + c) as u16);
            worksheet
                .write_formula(row, col, Formula::new(formula))
                .map_err(xlsx_err)?;
        }
    }
    Ok(())
}

fn write_kept_value(worksheet: &mut Worksheet, row: u32, col: u16, value: &Data, date: &Format) -> IoResult<()> {
    match value {
        Data::Empty => return Ok(()),
        Data::String(s) => worksheet.write_string(row, col, s),
        Data::Float(f) => worksheet.write_number(row, col, *f),
        Data::Int(i) => worksheet.write_number(row, col, *i as f64),
        Data::Bool(b) => worksheet.write_boolean(row, col, *b),
        Data::DateTime(dt) => worksheet.write_number_with_format(row, col, dt.as_f64(), date),
        other => worksheet.write_string(row, col, other.to_string()),
    }
    .map_err(xlsx_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Result report
// ---------------------------------------------------------------------------

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xE7E6E6))
        .set_border(FormatBorder::Thin)
}

fn title_format() -> Format {
    Format::new().set_bold().set_font_size(14)
}

/// Fill and font colors for a status cell.
pub fn status_colors(status: Status) -> (u32, u32) {
    match status {
        Status::Match => (0xD4EDDA, 0x155724),
        Status::Older | Status::Newer => (0xFFF3CD, 0x856404),
        Status::NotFound => (0xF8D7DA, 0x721C24),
    }
}

fn status_format(status: Status) -> Format {
    let (fill, font) = status_colors(status);
    Format::new()
        .set_background_color(Color::RGB(fill))
        .set_font_color(Color::RGB(font))
        .set_border(FormatBorder::Thin)
}

fn write_row<I>(worksheet: &mut Worksheet, row: u32, cells: I, format: Option<&Format>) -> IoResult<()>
where
    I: IntoIterator<Item = String>,
{
    for (col, value) in cells.into_iter().enumerate() {
        let col = col as u16;
        match format {
            Some(f) => worksheet.write_string_with_format(row, col, value, f),
            None => worksheet.write_string(row, col, value),
        }
        .map_err(xlsx_err)?;
    }
    Ok(())
}

fn size_columns(worksheet: &mut Worksheet, count: usize) -> IoResult<()> {
    for col in 0..count as u16 {
        worksheet.set_column_width(col, 18).map_err(xlsx_err)?;
    }
    Ok(())
}

/// Write the results table at `first_row`, colouring the status cells.
/// Returns the next free row.
fn write_results_block(
    worksheet: &mut Worksheet,
    first_row: u32,
    results: &[ClassificationResult],
) -> IoResult<u32> {
    let header = header_format();
    write_row(worksheet, first_row, RESULT_HEADERS.iter().map(|h| h.to_string()), Some(&header))?;

    let part_col = RESULT_HEADERS.iter().position(|h| *h == "Part Status").unwrap_or(3) as u16;
    let sw_col = RESULT_HEADERS.iter().position(|h| *h == "SW Status").unwrap_or(6) as u16;

    let mut row = first_row + 1;
    for r in results {
        write_row(worksheet, row, result_cells(r), None)?;
        worksheet
            .write_string_with_format(row, part_col, r.part_status.label(), &status_format(r.part_status))
            .map_err(xlsx_err)?;
        worksheet
            .write_string_with_format(row, sw_col, r.sw_status.label(), &status_format(r.sw_status))
            .map_err(xlsx_err)?;
        row += 1;
    }
    Ok(row)
}

fn write_name_list(worksheet: &mut Worksheet, first_row: u32, title: &str, names: &[String]) -> IoResult<u32> {
    let header = header_format();
    worksheet
        .write_string_with_format(first_row, 0, format!("{title} ({})", names.len()), &header)
        .map_err(xlsx_err)?;
    let mut row = first_row + 1;
    if names.is_empty() {
        worksheet.write_string(row, 0, "(none)").map_err(xlsx_err)?;
        row += 1;
    }
    for name in names {
        worksheet.write_string(row, 0, name).map_err(xlsx_err)?;
        row += 1;
    }
    Ok(row)
}

/// Export a run as a workbook: `Results` (the flat table with coloured
/// statuses) and `Remediation` (the plan, one section per bucket).
pub fn export_report(path: &Path, result: &ReconResult) -> IoResult<()> {
    let mut workbook = XlsxWorkbook::new();

    let results_sheet = workbook.add_worksheet();
    results_sheet.set_name("Results").map_err(xlsx_err)?;
    let end = write_results_block(results_sheet, 0, &result.results)?;
    size_columns(results_sheet, RESULT_HEADERS.len())?;
    results_sheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
    if end > 1 {
        results_sheet
            .autofilter(0, 0, end - 1, RESULT_HEADERS.len() as u16 - 1)
            .map_err(xlsx_err)?;
    }

    let plan_sheet = workbook.add_worksheet();
    plan_sheet.set_name("Remediation").map_err(xlsx_err)?;
    size_columns(plan_sheet, RESULT_HEADERS.len())?;

    let title = title_format();
    plan_sheet
        .write_string_with_format(0, 0, format!("Remediation Plan: {}", result.meta.report), &title)
        .map_err(xlsx_err)?;
    plan_sheet
        .write_string(
            1,
            0,
            format!(
                "{} ECUs checked, {} need an update, generated {}",
                result.summary.total_ecus, result.summary.needs_update, result.meta.run_at
            ),
        )
        .map_err(xlsx_err)?;

    let mut row = 3;
    for (level, bucket) in result.plan.buckets() {
        plan_sheet
            .write_string_with_format(row, 0, format!("Priority {level} ({})", bucket.len()), &title)
            .map_err(xlsx_err)?;
        row = if bucket.is_empty() {
            plan_sheet.write_string(row + 1, 0, "(none)").map_err(xlsx_err)?;
            row + 2
        } else {
            write_results_block(plan_sheet, row + 1, bucket)?
        };
        row += 1;
    }

    row = write_name_list(plan_sheet, row, "Other, no update needed", &result.plan.other_no_update)? + 1;
    row = write_name_list(plan_sheet, row, "Missing from reference or scan", &result.plan.missing)? + 1;
    write_name_list(plan_sheet, row, "Deferred (priority 0)", &result.plan.deferred)?;

    workbook.save(path).map_err(xlsx_err)?;
    tracing::info!(path = %path.display(), "wrote workbook report");
    Ok(())
}
