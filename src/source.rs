use std::path::Path;

use crate::error::{Result, SyncError};

// ---------------------------------------------------------------------------
// A1 cell ranges
// ---------------------------------------------------------------------------

/// A rectangular block of cells, 0-based and inclusive. An open `end_row`
/// runs to the last row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: Option<String>,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: Option<u32>,
    pub end_col: u32,
}

impl CellRange {
    /// Parse `A3:AR3`, `A3:AR`, `B2` or a sheet-qualified form such as
    /// `'To Update on DB'!A3:AR3`.
    pub fn parse(raw: &str) -> Result<Self> {
        let bad = || SyncError::InvalidRange(raw.to_string());
        let raw_trimmed = raw.trim();

        let (sheet, cells) = match raw_trimmed.rsplit_once('!') {
            Some((sheet, cells)) => {
                let sheet = sheet.trim();
                let sheet = sheet
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .unwrap_or(sheet)
                    .replace("''", "'");
                if sheet.is_empty() {
                    return Err(bad());
                }
                (Some(sheet), cells)
            }
            None => (None, raw_trimmed),
        };

        let (start, end) = match cells.split_once(':') {
            Some((s, e)) => (s, Some(e)),
            None => (cells, None),
        };

        let (start_col, start_row) = parse_cell_ref(start).ok_or_else(bad)?;
        let start_row = start_row.ok_or_else(bad)?;

        let (end_col, end_row) = match end {
            Some(e) => parse_cell_ref(e).ok_or_else(bad)?,
            None => (start_col, Some(start_row)),
        };

        if end_col < start_col || end_row.is_some_and(|r| r < start_row) {
            return Err(bad());
        }

        Ok(CellRange {
            sheet,
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    pub fn width(&self) -> usize {
        (self.end_col - self.start_col + 1) as usize
    }
}

/// `AR12` -> (43, Some(11)); `AR` -> (43, None).
fn parse_cell_ref(raw: &str) -> Option<(u32, Option<u32>)> {
    let raw = raw.trim().to_ascii_uppercase();
    let split = raw.find(|c: char| c.is_ascii_digit()).unwrap_or(raw.len());
    let (letters, digits) = raw.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        col = col.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    let row = if digits.is_empty() {
        None
    } else {
        let n: u32 = digits.parse().ok()?;
        if n == 0 {
            return None;
        }
        Some(n - 1)
    };
    Some((col - 1, row))
}

// ---------------------------------------------------------------------------
// Source kinds, dispatched on the file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    Csv,
    #[cfg(feature = "xlsx")]
    Workbook,
}

impl SourceKind {
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            _ => Err(SyncError::UnsupportedSource(path.display().to_string())),
        }
    }

    #[cfg_attr(not(feature = "xlsx"), allow(unused_variables))]
    pub fn read(&self, path: &Path, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
        let sheet = range.sheet.as_deref().unwrap_or(sheet);
        let rows = match self {
            Self::Csv => read_csv(path, range)?,
            #[cfg(feature = "xlsx")]
            Self::Workbook => read_workbook(path, sheet, range)?,
        };
        Ok(drop_trailing_blank_rows(rows))
    }
}

/// Read every row of `range` from the file at `path` in one pass.
pub fn read_rows(path: &Path, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
    SourceKind::for_path(path)?.read(path, sheet, range)
}

fn drop_trailing_blank_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    while rows
        .last()
        .is_some_and(|r| r.iter().all(|c| c.trim().is_empty()))
    {
        rows.pop();
    }
    rows
}

fn trim_trailing_blanks(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    cells
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Empty lines the reader skipped before the record that starts reading at
/// `offset`. Counts `\n`, `\r\n` and a lone `\r` as one line each.
fn skipped_empty_lines(data: &[u8], offset: usize) -> u32 {
    let mut i = offset;
    // The `\n` that finishes the previous record's CRLF.
    if i > 0 && data.get(i) == Some(&b'\n') && data.get(i - 1) == Some(&b'\r') {
        i += 1;
    }
    let mut lines = 0;
    while let Some(&b) = data.get(i) {
        match b {
            b'\n' => {}
            b'\r' if data.get(i + 1) == Some(&b'\n') => i += 1,
            b'\r' => {}
            _ => break,
        }
        lines += 1;
        i += 1;
    }
    lines
}

fn read_csv(path: &Path, range: &CellRange) -> Result<Vec<Vec<String>>> {
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    };
    let data = std::fs::read(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data.as_slice());

    let mut rows = Vec::new();
    let mut sheet_row: u32 = 0;
    for result in rdr.records() {
        // Malformed preamble lines surface as errors too.
        let record = result?;
        // The reader drops empty lines, but each one is still a sheet row.
        if let Some(pos) = record.position() {
            sheet_row += skipped_empty_lines(&data, pos.byte() as usize);
        }
        let idx = sheet_row;
        sheet_row += 1;

        if idx < range.start_row {
            continue;
        }
        if range.end_row.is_some_and(|end| idx > end) {
            break;
        }
        while range.start_row + (rows.len() as u32) < idx {
            rows.push(Vec::new());
        }
        let cells = record
            .iter()
            .skip(range.start_col as usize)
            .take(range.width())
            .map(str::to_string)
            .collect();
        rows.push(trim_trailing_blanks(cells));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Workbooks (xlsx, xls, ods), behind the `xlsx` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.get(..10).unwrap_or(s).to_string(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, sheet: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| SyncError::Workbook(format!("Failed to open {}: {e}", path.display())))?;

    let available = workbook.sheet_names().to_owned();
    if !available.iter().any(|name| name == sheet) {
        return Err(SyncError::UnknownSheet {
            sheet: sheet.to_string(),
            available,
        });
    }
    let data = workbook
        .worksheet_range(sheet)
        .map_err(|e| SyncError::Workbook(e.to_string()))?;

    // Positions below are absolute sheet coordinates.
    let Some((last_row, last_col)) = data.end() else {
        return Ok(Vec::new());
    };
    let end_row = range.end_row.map_or(last_row, |r| r.min(last_row));
    let end_col = range.end_col.min(last_col);
    if range.start_row > end_row || range.start_col > end_col {
        return Ok(Vec::new());
    }

    let rows = (range.start_row..=end_row)
        .map(|r| {
            let cells = (range.start_col..=end_col)
                .map(|c| data.get_value((r, c)).map(cell_to_string).unwrap_or_default())
                .collect();
            trim_trailing_blanks(cells)
        })
        .collect();
    Ok(rows)
}
