// Normalized store: SQLite with store-enforced foreign keys

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction};
use serde::Serialize;

use pudl_core::reference::RefValue;
use pudl_core::{CanonicalEntity, EntityKind, ReferenceData, Schema, SourceKey, SourceRecord};
use pudl_recon::model::{LoadStep, ReconResult};

use crate::error::StoreError;

const META_SCHEMA: &str = r#"
CREATE TABLE pudl_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE pudl_tables (
    position INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
"#;

/// Whether a load may discard content already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Refuse unless the store holds no pipeline tables.
    IfEmpty,
    /// Drop and reload everything the pipeline manages.
    Replace,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Tables dropped before the reload; empty on a first load.
    pub replaced: Vec<String>,
    pub tables_created: usize,
    pub rows_written: usize,
}

/// Replace the store content with `result` in one transaction.
///
/// On any error nothing is committed and the previous content stays
/// visible. A store file created by a failed first load is removed again.
pub fn replace(
    path: &Path,
    schema: &Schema,
    result: &ReconResult,
    reference: &ReferenceData,
    mode: ReplaceMode,
) -> Result<LoadReport, StoreError> {
    let created = !path.exists();
    let outcome = replace_in(path, schema, result, reference, mode);
    if outcome.is_err() && created {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("cannot remove {} after failed load: {e}", path.display());
            }
        }
    }
    outcome
}

fn replace_in(
    path: &Path,
    schema: &Schema,
    result: &ReconResult,
    reference: &ReferenceData,
    mode: ReplaceMode,
) -> Result<LoadReport, StoreError> {
    let mut conn = Connection::open(path)?;
    // Has no effect inside a transaction; must precede BEGIN
    conn.pragma_update(None, "foreign_keys", true)?;

    let managed = managed_tables(&conn)?;
    let present: Vec<String> = schema
        .tables()
        .into_iter()
        .chain(["pudl_meta".to_string(), "pudl_tables".to_string()])
        .filter(|t| !managed.contains(t))
        .map(|t| table_exists(&conn, &t).map(|exists| (t, exists)))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(t, exists)| exists.then_some(t))
        .collect();
    let mut replaced = managed;
    replaced.extend(present);

    if mode == ReplaceMode::IfEmpty && !replaced.is_empty() {
        return Err(StoreError::NotEmpty {
            path: path.to_path_buf(),
            tables: replaced,
        });
    }

    let tx = conn.transaction()?;

    for table in replaced.iter().rev() {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(table)))?;
    }
    for table in schema.drop_order() {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
    }
    tx.execute_batch("DROP TABLE IF EXISTS pudl_tables; DROP TABLE IF EXISTS pudl_meta;")?;

    tx.execute_batch(META_SCHEMA)?;
    let create = schema.create_statements();
    for ddl in &create {
        tx.execute_batch(ddl)?;
    }

    let mut rows_written = 0;
    for step in result.reconciled.load_order() {
        rows_written += match step {
            LoadStep::Canonical(entity) => insert_canonical(&tx, &entity.table, &entity.canonical)?,
            LoadStep::Source(entity, set) => insert_source(
                &tx,
                &set.def.table,
                [
                    set.def.id_column.as_str(),
                    set.def.name_column.as_str(),
                    entity.kind.link_column(),
                ],
                &set.records,
            )?,
        };
    }
    rows_written += insert_reference(&tx, reference)?;

    write_meta(&tx, schema, result)?;
    tx.commit()?;

    log::info!(
        "loaded {} rows into {} tables at {}",
        rows_written,
        create.len(),
        path.display()
    );
    if !replaced.is_empty() {
        log::debug!("replaced tables: {}", replaced.join(", "));
    }

    Ok(LoadReport {
        replaced,
        tables_created: create.len(),
        rows_written,
    })
}

/// Tables recorded by the last successful load, parents first.
fn managed_tables(conn: &Connection) -> Result<Vec<String>, StoreError> {
    if !table_exists(conn, "pudl_tables")? {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare("SELECT name FROM pudl_tables ORDER BY position")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Quote a table name read back from the store.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map a constraint failure to the table it happened in.
fn rejected(table: &str) -> impl Fn(rusqlite::Error) -> StoreError + '_ {
    move |e| {
        if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            StoreError::Constraint {
                table: table.to_string(),
                message: e.to_string(),
            }
        } else {
            StoreError::Sqlite(e)
        }
    }
}

fn insert_canonical(tx: &Transaction, table: &str, rows: &[CanonicalEntity]) -> Result<usize, StoreError> {
    let mut stmt = tx.prepare(&format!("INSERT INTO {table} (id, name) VALUES (?1, ?2)"))?;
    for row in rows {
        stmt.execute(params![row.id, row.name]).map_err(rejected(table))?;
    }
    Ok(rows.len())
}

fn insert_source(
    tx: &Transaction,
    table: &str,
    [id, name, link]: [&str; 3],
    rows: &[SourceRecord],
) -> Result<usize, StoreError> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} ({id}, {name}, {link}) VALUES (?1, ?2, ?3)"
    ))?;
    for row in rows {
        stmt.execute(params![row.source_id, row.name, row.canonical_id])
            .map_err(rejected(table))?;
    }
    Ok(rows.len())
}

fn insert_reference(tx: &Transaction, reference: &ReferenceData) -> Result<usize, StoreError> {
    let mut written = 0;
    for set in reference.rows() {
        let placeholders: Vec<String> = (1..=set.columns.len()).map(|i| format!("?{i}")).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            set.table,
            set.columns.join(", "),
            placeholders.join(", ")
        ))?;
        for row in &set.rows {
            let values = row.iter().map(|v| match v {
                RefValue::Int(n) => Value::Integer(*n),
                RefValue::Text(s) => Value::Text(s.clone()),
            });
            stmt.execute(params_from_iter(values)).map_err(rejected(set.table))?;
        }
        written += set.rows.len();
    }
    Ok(written)
}

fn write_meta(tx: &Transaction, schema: &Schema, result: &ReconResult) -> Result<(), StoreError> {
    let loaded_at = chrono::Utc::now().to_rfc3339();
    let mut meta = tx.prepare("INSERT INTO pudl_meta (key, value) VALUES (?1, ?2)")?;
    for (key, value) in [
        ("mapping_name", result.meta.mapping_name.as_str()),
        ("engine_version", result.meta.engine_version.as_str()),
        ("reconciled_at", result.meta.run_at.as_str()),
        ("loaded_at", loaded_at.as_str()),
    ] {
        meta.execute(params![key, value])?;
    }

    let mut tables = tx.prepare("INSERT INTO pudl_tables (position, name) VALUES (?1, ?2)")?;
    for (position, name) in schema.tables().iter().enumerate() {
        tables.execute(params![position as i64, name])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSnapshot {
    pub source: String,
    pub table: String,
    pub records: Vec<SourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub kind: EntityKind,
    pub table: String,
    pub canonical: Vec<CanonicalEntity>,
    pub sources: Vec<SourceSnapshot>,
}

/// Canonical entities and source linkage as committed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    pub meta: BTreeMap<String, String>,
    pub entities: Vec<EntitySnapshot>,
}

impl StoreSnapshot {
    /// Everything except `pudl_meta`, which records load times.
    pub fn same_content(&self, other: &StoreSnapshot) -> bool {
        self.entities == other.entities
    }
}

/// Read the committed content for `schema` without modifying the store.
pub fn read_snapshot(path: &Path, schema: &Schema) -> Result<StoreSnapshot, StoreError> {
    if !path.exists() {
        return Err(StoreError::Missing { path: path.to_path_buf() });
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    if !table_exists(&conn, "pudl_meta")? {
        return Err(StoreError::NotLoaded { path: path.to_path_buf() });
    }

    let mut stmt = conn.prepare("SELECT key, value FROM pudl_meta")?;
    let meta = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let mut entities = Vec::with_capacity(schema.entities.len());
    for entity in &schema.entities {
        let mut stmt = conn.prepare(&format!("SELECT id, name FROM {} ORDER BY id", entity.table))?;
        let canonical = stmt
            .query_map([], |row| Ok(CanonicalEntity { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources = Vec::with_capacity(entity.sources.len());
        for source in &entity.sources {
            let order = match source.key {
                SourceKey::Id => source.id_column.clone(),
                SourceKey::IdAndName => format!("{}, {}", source.id_column, source.name_column),
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {id}, {name}, {link} FROM {table} ORDER BY {order}",
                id = source.id_column,
                name = source.name_column,
                link = entity.kind.link_column(),
                table = source.table,
            ))?;
            let records = stmt
                .query_map([], |row| {
                    Ok(SourceRecord {
                        source_id: row.get(0)?,
                        name: row.get(1)?,
                        canonical_id: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            sources.push(SourceSnapshot {
                source: source.source.clone(),
                table: source.table.clone(),
                records,
            });
        }

        entities.push(EntitySnapshot {
            kind: entity.kind,
            table: entity.table.clone(),
            canonical,
            sources,
        });
    }

    Ok(StoreSnapshot { meta, entities })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_embedded_quotes() {
        assert_eq!(quote("plants"), "\"plants\"");
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn missing_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sqlite");
        let err = read_snapshot(&path, &Schema::new(Vec::new())).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unloaded_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE other (x INTEGER)").unwrap();
        let err = read_snapshot(&path, &Schema::new(Vec::new())).unwrap_err();
        assert!(matches!(err, StoreError::NotLoaded { .. }));
    }
}
