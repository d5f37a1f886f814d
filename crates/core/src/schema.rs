use crate::entity::EntityKind;
use crate::reference;

// ---------------------------------------------------------------------------
// Schema registry
// ---------------------------------------------------------------------------

/// How a source table's primary key is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKey {
    /// The source-native id alone.
    Id,
    /// The source-native id together with the name (e.g. FERC Form 1 plants,
    /// which are only identified by respondent + plant name).
    IdAndName,
}

/// One per-source table: the entity of one kind as one source reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    /// Source label, e.g. `eia923`.
    pub source: String,
    pub table: String,
    pub id_column: String,
    pub name_column: String,
    pub key: SourceKey,
    /// Another source table whose id column this table's id references.
    pub id_references: Option<String>,
}

/// A canonical entity table and the source tables that link to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: String,
    pub sources: Vec<SourceTable>,
}

/// The full normalized schema for one pipeline run.
///
/// Built once from the mapping config and passed to every stage. Renders its
/// own DDL so that every link from a source record to its canonical entity is
/// a store-enforced foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub entities: Vec<EntitySchema>,
}

impl Schema {
    pub fn new(entities: Vec<EntitySchema>) -> Self {
        Self { entities }
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    pub fn source_table(&self, table: &str) -> Option<(&EntitySchema, &SourceTable)> {
        self.entities.iter().find_map(|e| {
            e.sources.iter().find(|s| s.table == table).map(|s| (e, s))
        })
    }

    /// Source tables in insertion order: tables that reference another
    /// source table come after all tables that do not.
    pub fn ordered_sources(&self) -> Vec<(&EntitySchema, &SourceTable)> {
        let all = self.entities.iter().flat_map(|e| e.sources.iter().map(move |s| (e, s)));
        let (plain, referencing): (Vec<_>, Vec<_>) =
            all.partition(|(_, s)| s.id_references.is_none());
        plain.into_iter().chain(referencing).collect()
    }

    /// Every table the pipeline manages, parents before children.
    pub fn tables(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entities.iter().map(|e| e.table.clone()).collect();
        out.extend(self.ordered_sources().into_iter().map(|(_, s)| s.table.clone()));
        out.extend(reference::TABLES.iter().map(|(name, _)| name.to_string()));
        out
    }

    /// Reverse of [`Schema::tables`]; children are dropped before parents.
    pub fn drop_order(&self) -> Vec<String> {
        let mut tables = self.tables();
        tables.reverse();
        tables
    }

    /// `CREATE TABLE` statements in dependency order.
    pub fn create_statements(&self) -> Vec<String> {
        let mut out = Vec::new();

        for entity in &self.entities {
            out.push(format!(
                "CREATE TABLE {} (\n    id INTEGER PRIMARY KEY,\n    name TEXT NOT NULL\n)",
                entity.table
            ));
        }

        for (entity, source) in self.ordered_sources() {
            out.push(source_ddl(entity, source, self));
        }

        out.extend(reference::TABLES.iter().map(|(_, ddl)| ddl.to_string()));
        out
    }
}

fn source_ddl(entity: &EntitySchema, source: &SourceTable, schema: &Schema) -> String {
    let link = entity.kind.link_column();

    let id_fk = source
        .id_references
        .as_deref()
        .and_then(|t| schema.source_table(t))
        .map(|(_, parent)| format!(" REFERENCES {}({})", parent.table, parent.id_column))
        .unwrap_or_default();

    match source.key {
        SourceKey::Id => format!(
            "CREATE TABLE {table} (\n    {id} INTEGER PRIMARY KEY{id_fk},\n    {name} TEXT NOT NULL,\n    {link} INTEGER NOT NULL REFERENCES {canonical}(id)\n)",
            table = source.table,
            id = source.id_column,
            name = source.name_column,
            canonical = entity.table,
        ),
        SourceKey::IdAndName => format!(
            "CREATE TABLE {table} (\n    {id} INTEGER NOT NULL{id_fk},\n    {name} TEXT NOT NULL,\n    {link} INTEGER NOT NULL REFERENCES {canonical}(id),\n    PRIMARY KEY ({id}, {name})\n)",
            table = source.table,
            id = source.id_column,
            name = source.name_column,
            canonical = entity.table,
        ),
    }
}

/// SQLite keywords, sorted. Rejected as table and column names.
const SQL_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS",
    "ASC", "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE",
    "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT",
    "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "DATABASE", "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH",
    "DISTINCT", "DO", "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE",
    "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL", "FILTER", "FIRST", "FOLLOWING", "FOR",
    "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB", "GROUP", "GROUPS", "HAVING", "IF",
    "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT",
    "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY", "LAST", "LEFT",
    "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT", "NOTHING",
    "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER",
    "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME",
    "REPLACE", "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT",
    "SELECT", "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION",
    "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES",
    "VIEW", "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// True if `s` can be interpolated into DDL unquoted.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    let upper = s.to_ascii_uppercase();
    !upper.starts_with("SQLITE_") && SQL_KEYWORDS.binary_search(&upper.as_str()).is_err()
}
