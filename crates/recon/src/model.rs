use pudl_core::{CanonicalEntity, EntityKind, SourceRecord, SourceTable};
use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Declared type of a cross-reference column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer identifier.
    Id,
    /// Free-text display name.
    Name,
}

/// A typed cross-reference cell after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Int(i64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// One curated correspondence row.
#[derive(Debug, Clone)]
pub struct CrossRefRow {
    /// 1-based row number in the originating sheet.
    pub line: usize,
    pub cells: Vec<Cell>,
}

/// The wide cross-reference table for one entity kind.
#[derive(Debug, Clone)]
pub struct CrossRefTable {
    pub kind: EntityKind,
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<CrossRefRow>,
}

impl CrossRefTable {
    pub fn column(&self, name: &str) -> Result<usize, ReconError> {
        self.columns.iter().position(|c| c == name).ok_or_else(|| ReconError::MissingColumn {
            kind: self.kind,
            sheet: self.sheet.clone(),
            column: name.into(),
        })
    }

    /// Integer value of `row[idx]`; `None` when blank.
    pub fn int(&self, row: &CrossRefRow, idx: usize) -> Result<Option<i64>, ReconError> {
        match row.cells.get(idx).unwrap_or(&Cell::Missing) {
            Cell::Int(n) => Ok(Some(*n)),
            Cell::Missing => Ok(None),
            Cell::Text(s) => Err(self.type_error(row, idx, "an integer id", s)),
        }
    }

    /// Text value of `row[idx]`; integers are rendered, blanks are `None`.
    pub fn text(&self, row: &CrossRefRow, idx: usize) -> Option<String> {
        match row.cells.get(idx).unwrap_or(&Cell::Missing) {
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(n) => Some(n.to_string()),
            Cell::Missing => None,
        }
    }

    fn type_error(&self, row: &CrossRefRow, idx: usize, expected: &'static str, found: &str) -> ReconError {
        ReconError::CellType {
            kind: self.kind,
            sheet: self.sheet.clone(),
            line: row.line,
            column: self.columns[idx].clone(),
            expected,
            found: found.into(),
        }
    }
}

/// Pre-loaded cross-reference tables, one per declared entity kind.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub tables: Vec<CrossRefTable>,
}

impl ReconInput {
    pub(crate) fn take(&mut self, kind: EntityKind) -> Option<CrossRefTable> {
        let idx = self.tables.iter().position(|t| t.kind == kind)?;
        Some(self.tables.swap_remove(idx))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A per-source row dropped because it carries no complete source linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteRow {
    pub line: usize,
    pub source_id: Option<i64>,
    pub name: Option<String>,
    pub canonical_id: Option<i64>,
}

/// Validated records for one source table.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub def: SourceTable,
    pub records: Vec<SourceRecord>,
    pub dropped: Vec<IncompleteRow>,
}

/// Canonical entities of one kind plus every source table that links to them.
#[derive(Debug, Clone)]
pub struct ReconciledEntity {
    pub kind: EntityKind,
    pub table: String,
    pub canonical: Vec<CanonicalEntity>,
    pub sources: Vec<SourceSet>,
}

/// One unit of work for the persister.
#[derive(Debug, Clone, Copy)]
pub enum LoadStep<'a> {
    Canonical(&'a ReconciledEntity),
    Source(&'a ReconciledEntity, &'a SourceSet),
}

#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub entities: Vec<ReconciledEntity>,
}

impl Reconciled {
    pub fn entity(&self, kind: EntityKind) -> Option<&ReconciledEntity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    pub fn source_set(&self, table: &str) -> Option<&SourceSet> {
        self.entities
            .iter()
            .flat_map(|e| e.sources.iter())
            .find(|s| s.def.table == table)
    }

    /// Every record set in dependency order: all canonical sets, then source
    /// sets, with sets whose id references another source table last.
    pub fn load_order(&self) -> Vec<LoadStep<'_>> {
        let mut steps: Vec<LoadStep<'_>> =
            self.entities.iter().map(LoadStep::Canonical).collect();

        let sources = || self.entities.iter().flat_map(|e| e.sources.iter().map(move |s| (e, s)));
        steps.extend(
            sources()
                .filter(|(_, s)| s.def.id_references.is_none())
                .map(|(e, s)| LoadStep::Source(e, s)),
        );
        steps.extend(
            sources()
                .filter(|(_, s)| s.def.id_references.is_some())
                .map(|(e, s)| LoadStep::Source(e, s)),
        );
        steps
    }
}

// ---------------------------------------------------------------------------
// Summary + Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub table: String,
    pub records: usize,
    pub dropped: Vec<IncompleteRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub kind: EntityKind,
    pub table: String,
    pub canonical: usize,
    pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub canonical_total: usize,
    pub source_records_total: usize,
    pub dropped_total: usize,
    pub entities: Vec<EntitySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub mapping_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    #[serde(skip)]
    pub reconciled: Reconciled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CrossRefTable {
        CrossRefTable {
            kind: EntityKind::Utility,
            sheet: "utilities_output".into(),
            columns: vec!["utility_id".into(), "utility_name".into()],
            rows: vec![CrossRefRow {
                line: 2,
                cells: vec![Cell::Text("abc".into()), Cell::Int(12)],
            }],
        }
    }

    #[test]
    fn text_in_id_column_is_a_type_error() {
        let t = table();
        let err = t.int(&t.rows[0], 0).unwrap_err();
        assert!(err.to_string().contains("row 2: column 'utility_id' expects an integer id, found 'abc'"));
    }

    #[test]
    fn numeric_name_renders_as_text() {
        let t = table();
        assert_eq!(t.text(&t.rows[0], 1).as_deref(), Some("12"));
        assert_eq!(t.text(&t.rows[0], 7), None);
    }

    #[test]
    fn missing_column_names_sheet() {
        let err = table().column("respondent_id_ferc1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "utility sheet 'utilities_output': missing column 'respondent_id_ferc1'"
        );
    }
}
