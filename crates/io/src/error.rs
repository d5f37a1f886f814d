use std::path::PathBuf;

use pudl_core::EntityKind;
use thiserror::Error;

/// The cross-reference input could not be read into typed tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open workbook {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Neither a directory nor a recognized workbook extension.
    #[error("{}: expected a workbook (.xlsx, .xlsm, .xlsb, .xls, .ods) or a directory of <sheet>.csv files", .path.display())]
    UnsupportedInput { path: PathBuf },

    #[error("{kind}: sheet '{sheet}' not found in {}", .path.display())]
    MissingSheet { kind: EntityKind, sheet: String, path: PathBuf },

    #[error("sheet '{sheet}' has no header row")]
    EmptySheet { sheet: String },

    #[error("sheet '{sheet}': missing column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("sheet '{sheet}': column '{column}' appears more than once in the header")]
    DuplicateHeader { sheet: String, column: String },

    /// A cell in an id column that is not an integer.
    #[error("sheet '{sheet}', row {line}: column '{column}' expects an integer id, found {found}")]
    NotAnId { sheet: String, line: usize, column: String, found: String },

    /// A spreadsheet error value (`#N/A`, `#REF!`, ...) in a mapped column.
    #[error("sheet '{sheet}', row {line}: column '{column}' holds a cell error {found}")]
    CellError { sheet: String, line: usize, column: String, found: String },
}

/// The normalized store could not be written or read.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store rejected a row (foreign key, primary key or NOT NULL).
    #[error("store rejected a row in '{table}': {message}")]
    Constraint { table: String, message: String },

    #[error("store {} already holds {}", .path.display(), .tables.join(", "))]
    NotEmpty { path: PathBuf, tables: Vec<String> },

    #[error("store {} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("store {} has not been loaded", .path.display())]
    NotLoaded { path: PathBuf },
}
