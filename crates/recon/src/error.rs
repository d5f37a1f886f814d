use pudl_core::EntityKind;
use thiserror::Error;

/// A name or link disagreement between two rows that share an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The shared identifier, rendered for display (`42` or `42/"Plant A"`).
    pub key: String,
    /// Which value disagrees: `name` or `canonical id`.
    pub field: &'static str,
    pub first: String,
    pub second: String,
    /// 1-based sheet row of the second occurrence.
    pub line: usize,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id {} has {} '{}' and '{}' (row {})",
            self.key, self.field, self.first, self.second, self.line
        )
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Mapping config validation error.
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// No cross-reference table was supplied for a declared entity.
    #[error("{kind}: no cross-reference table for sheet '{sheet}'")]
    MissingTable { kind: EntityKind, sheet: String },

    #[error("{kind} sheet '{sheet}': missing column '{column}'")]
    MissingColumn { kind: EntityKind, sheet: String, column: String },

    /// A cell holds the wrong type for its column (text in an id column).
    #[error("{kind} sheet '{sheet}', row {line}: column '{column}' expects {expected}, found '{found}'")]
    CellType {
        kind: EntityKind,
        sheet: String,
        line: usize,
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A cross-reference row without a canonical id or name.
    #[error("{kind} sheet '{sheet}', row {line}: canonical column '{column}' is blank")]
    MissingCanonical { kind: EntityKind, sheet: String, line: usize, column: String },

    /// More incomplete rows in a per-source projection than the policy allows.
    #[error(
        "{kind} table '{table}': {} incomplete row(s) at sheet rows {}, at most {limit} tolerated; the curated mapping needs correction",
        .lines.len(),
        join_lines(.lines)
    )]
    CurationIncomplete { kind: EntityKind, table: String, lines: Vec<usize>, limit: usize },

    /// Rows sharing an identifier disagree on name or canonical link.
    #[error(
        "{kind} table '{table}': {} conflicting row(s): {}",
        .conflicts.len(),
        join_conflicts(.conflicts)
    )]
    Conflicts { kind: EntityKind, table: String, conflicts: Vec<Conflict> },

    /// A record points at an identifier that is not in its target set.
    #[error("{kind} table '{table}': {column} {value} references missing {target} id")]
    IntegrityViolation {
        kind: EntityKind,
        table: String,
        column: String,
        value: i64,
        target: String,
    },
}

impl ReconError {
    /// Input that could not be read as a cross-reference at all, as opposed to
    /// a well-formed input with curation defects.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::MissingTable { .. }
                | Self::MissingColumn { .. }
                | Self::CellType { .. }
                | Self::MissingCanonical { .. }
        )
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}

fn join_conflicts(conflicts: &[Conflict]) -> String {
    conflicts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("; ")
}
