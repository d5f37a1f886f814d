// Cross-reference import: workbook sheets or a directory of CSV files

use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use pudl_recon::config::{EntityConfig, MappingConfig};
use pudl_recon::model::{Cell, ColumnType, CrossRefRow, CrossRefTable, ReconInput};

use crate::error::LoadError;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Largest integer an f64 represents exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Load the sheet for every entity in `config` from a workbook or a CSV
/// directory. Either every table loads or none does.
pub fn load(path: &Path, config: &MappingConfig) -> Result<ReconInput, LoadError> {
    let tables = if path.is_dir() {
        load_csv_dir(path, config)?
    } else if is_workbook(path) {
        load_workbook(path, config)?
    } else {
        return Err(LoadError::UnsupportedInput { path: path.to_path_buf() });
    };
    Ok(ReconInput { tables })
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Raw grid
// ---------------------------------------------------------------------------

/// A cell as the reader saw it, before per-column coercion.
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    /// Booleans, dates and durations: rendered text, never an id.
    Other(String),
    Error(String),
}

struct RawRow {
    /// 1-based row number in the sheet or file.
    line: usize,
    cells: Vec<RawCell>,
}

impl RawCell {
    fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(trimmed.to_string())
        }
    }

    fn header(&self) -> Option<String> {
        match self {
            RawCell::Empty | RawCell::Error(_) => None,
            RawCell::Text(s) | RawCell::Other(s) => Some(s.clone()),
            RawCell::Int(n) => Some(n.to_string()),
            RawCell::Float(f) => Some(render_float(*f)),
        }
    }
}

fn render_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, config: &MappingConfig) -> Result<Vec<CrossRefTable>, LoadError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| LoadError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut tables = Vec::with_capacity(config.entities.len());
    for entity in &config.entities {
        if !sheet_names.iter().any(|s| *s == entity.sheet) {
            return Err(LoadError::MissingSheet {
                kind: entity.kind,
                sheet: entity.sheet.clone(),
                path: path.to_path_buf(),
            });
        }
        let range = workbook.worksheet_range(&entity.sheet).map_err(|e| LoadError::Workbook {
            path: path.to_path_buf(),
            message: format!("sheet '{}': {e}", entity.sheet),
        })?;

        // Range start offset (data may not begin at A1)
        let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let rows = range.rows().enumerate().map(|(i, row)| RawRow {
            line: start_row + i + 1,
            cells: row.iter().map(raw_from_data).collect(),
        });

        let table = coerce(entity, rows)?;
        log::debug!("{}: {} rows from sheet '{}'", entity.kind, table.rows.len(), entity.sheet);
        tables.push(table);
    }
    Ok(tables)
}

fn raw_from_data(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::from_text(s),
        Data::Float(f) => RawCell::Float(*f),
        Data::Int(n) => RawCell::Int(*n),
        Data::Bool(b) => RawCell::Other(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => RawCell::Error(format!("#{:?}", e)),
        Data::DateTime(dt) => RawCell::Other(format!("date serial {}", dt.as_f64())),
        Data::DateTimeIso(s) => RawCell::Other(s.clone()),
        Data::DurationIso(s) => RawCell::Other(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// CSV directory
// ---------------------------------------------------------------------------

fn load_csv_dir(dir: &Path, config: &MappingConfig) -> Result<Vec<CrossRefTable>, LoadError> {
    let mut tables = Vec::with_capacity(config.entities.len());
    for entity in &config.entities {
        let path = csv_path(dir, &entity.sheet);
        if !path.is_file() {
            return Err(LoadError::MissingSheet {
                kind: entity.kind,
                sheet: entity.sheet.clone(),
                path: dir.to_path_buf(),
            });
        }
        let rows = read_csv_rows(&path)?;
        let table = coerce(entity, rows.into_iter())?;
        log::debug!("{}: {} rows from {}", entity.kind, table.rows.len(), path.display());
        tables.push(table);
    }
    Ok(tables)
}

fn read_csv_rows(path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let content = read_file_as_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
        rows.push(RawRow {
            line,
            cells: record.iter().map(RawCell::from_text).collect(),
        });
    }
    Ok(rows)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports)
fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |source| LoadError::Io { path: path.to_path_buf(), source };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Turn raw rows into a typed table holding exactly the entity's mapped
/// columns. The first row with any content is the header.
fn coerce(
    entity: &EntityConfig,
    rows: impl Iterator<Item = RawRow>,
) -> Result<CrossRefTable, LoadError> {
    let mut rows = rows.skip_while(|r| r.cells.iter().all(|c| *c == RawCell::Empty));
    let header = rows.next().ok_or_else(|| LoadError::EmptySheet { sheet: entity.sheet.clone() })?;
    let header: Vec<Option<String>> = header.cells.iter().map(RawCell::header).collect();

    let mapped = entity.columns();
    let mut positions = Vec::with_capacity(mapped.len());
    for (column, ty) in &mapped {
        let mut hits = header.iter().enumerate().filter(|(_, h)| h.as_deref() == Some(column.as_str()));
        let (idx, _) = hits.next().ok_or_else(|| LoadError::MissingColumn {
            sheet: entity.sheet.clone(),
            column: column.clone(),
        })?;
        if hits.next().is_some() {
            return Err(LoadError::DuplicateHeader {
                sheet: entity.sheet.clone(),
                column: column.clone(),
            });
        }
        positions.push((idx, column.as_str(), *ty));
    }

    let mut out = Vec::new();
    for row in rows {
        let mut cells = Vec::with_capacity(positions.len());
        for &(idx, column, ty) in &positions {
            let raw = row.cells.get(idx).unwrap_or(&RawCell::Empty);
            cells.push(coerce_cell(raw, ty).map_err(|r| r.into_error(&entity.sheet, row.line, column))?);
        }
        if cells.iter().all(Cell::is_missing) {
            continue;
        }
        out.push(CrossRefRow { line: row.line, cells });
    }

    Ok(CrossRefTable {
        kind: entity.kind,
        sheet: entity.sheet.clone(),
        columns: mapped.into_iter().map(|(c, _)| c).collect(),
        rows: out,
    })
}

enum Rejection {
    NotAnId(String),
    CellError(String),
}

impl Rejection {
    fn into_error(self, sheet: &str, line: usize, column: &str) -> LoadError {
        match self {
            Rejection::NotAnId(found) => LoadError::NotAnId {
                sheet: sheet.to_string(),
                line,
                column: column.to_string(),
                found,
            },
            Rejection::CellError(found) => LoadError::CellError {
                sheet: sheet.to_string(),
                line,
                column: column.to_string(),
                found,
            },
        }
    }
}

fn coerce_cell(raw: &RawCell, ty: ColumnType) -> Result<Cell, Rejection> {
    match (raw, ty) {
        (RawCell::Empty, _) => Ok(Cell::Missing),
        (RawCell::Error(e), _) => Err(Rejection::CellError(e.clone())),

        (RawCell::Int(n), ColumnType::Id) => Ok(Cell::Int(*n)),
        (RawCell::Float(f), ColumnType::Id) => float_id(*f).ok_or_else(|| Rejection::NotAnId(render_float(*f))),
        (RawCell::Text(s), ColumnType::Id) => text_id(s).ok_or_else(|| Rejection::NotAnId(format!("'{s}'"))),
        (RawCell::Other(s), ColumnType::Id) => Err(Rejection::NotAnId(s.clone())),

        (RawCell::Int(n), ColumnType::Name) => Ok(Cell::Text(n.to_string())),
        (RawCell::Float(f), ColumnType::Name) => Ok(Cell::Text(render_float(*f))),
        (RawCell::Text(s) | RawCell::Other(s), ColumnType::Name) => Ok(Cell::Text(s.clone())),
    }
}

/// Spreadsheets store every number as a float; whole values are ids.
fn float_id(f: f64) -> Option<Cell> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT).then(|| Cell::Int(f as i64))
}

fn text_id(s: &str) -> Option<Cell> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(Cell::Int(n));
    }
    s.parse::<f64>().ok().and_then(float_id)
}

/// The CSV file a directory input is expected to hold for `sheet`.
pub fn csv_path(dir: &Path, sheet: &str) -> PathBuf {
    dir.join(format!("{sheet}.csv"))
}
