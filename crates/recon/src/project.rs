//! Narrowing a wide cross-reference table into single-purpose projections.
//!
//! Deduplication keeps the first occurrence of each key. Later occurrences
//! may fill a blank in the kept row, but never overwrite a value that
//! disagrees: disagreements are collected as [`Conflict`]s.

use std::collections::HashMap;

use pudl_core::{CanonicalEntity, SourceKey, SourceRecord};

use crate::config::{EntityConfig, SourceConfig};
use crate::error::{Conflict, ReconError};
use crate::model::{CrossRefTable, IncompleteRow};

// ---------------------------------------------------------------------------
// Canonical
// ---------------------------------------------------------------------------

/// (canonical id, canonical name), deduplicated by id.
pub fn project_canonical(
    entity: &EntityConfig,
    table: &CrossRefTable,
) -> Result<Vec<CanonicalEntity>, ReconError> {
    let id_idx = table.column(&entity.id)?;
    let name_idx = table.column(&entity.name)?;

    let mut out: Vec<CanonicalEntity> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for row in &table.rows {
        let blank = |column: &str| ReconError::MissingCanonical {
            kind: table.kind,
            sheet: table.sheet.clone(),
            line: row.line,
            column: column.into(),
        };
        let id = table.int(row, id_idx)?.ok_or_else(|| blank(&entity.id))?;
        let name = table.text(row, name_idx).ok_or_else(|| blank(&entity.name))?;

        match index.get(&id) {
            Some(&i) => {
                if out[i].name != name {
                    conflicts.push(Conflict {
                        key: id.to_string(),
                        field: "name",
                        first: out[i].name.clone(),
                        second: name,
                        line: row.line,
                    });
                }
            }
            None => {
                index.insert(id, out.len());
                out.push(CanonicalEntity { id, name });
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(ReconError::Conflicts {
            kind: table.kind,
            table: entity.table().to_string(),
            conflicts,
        });
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Per-source
// ---------------------------------------------------------------------------

/// Output of one per-source projection, before the incompleteness policy.
#[derive(Debug, Default)]
pub struct SourceProjection {
    pub records: Vec<SourceRecord>,
    /// Rows missing at least one of id, name, canonical id.
    pub incomplete: Vec<IncompleteRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Id(i64),
    IdName(i64, String),
    /// Key value blank: only rows identical in all three values collapse.
    Blank(Option<i64>, Option<String>, Option<i64>),
}

impl Key {
    fn display(&self) -> String {
        match self {
            Key::Id(id) => id.to_string(),
            Key::IdName(id, name) => format!("{id}/\"{name}\""),
            Key::Blank(..) => "(blank)".to_string(),
        }
    }
}

/// A deduplicated row; fields may still be blank.
struct Slot {
    line: usize,
    source_id: Option<i64>,
    name: Option<String>,
    canonical_id: Option<i64>,
}

impl Slot {
    fn into_result(self) -> Result<SourceRecord, IncompleteRow> {
        match (self.source_id, self.name, self.canonical_id) {
            (Some(source_id), Some(name), Some(canonical_id)) => Ok(SourceRecord {
                source_id,
                name,
                canonical_id,
            }),
            (source_id, name, canonical_id) => Err(IncompleteRow {
                line: self.line,
                source_id,
                name,
                canonical_id,
            }),
        }
    }
}

/// (source id, source name, canonical id), deduplicated by the source key.
///
/// Rows whose key is blank are incomplete. Such rows collapse only when they
/// agree on every projected value, so each canonical entity absent from the
/// source counts once.
pub fn project_source(
    entity: &EntityConfig,
    source: &SourceConfig,
    table: &CrossRefTable,
) -> Result<SourceProjection, ReconError> {
    let canonical_idx = table.column(&entity.id)?;
    let id_idx = table.column(&source.id)?;
    let name_idx = table.column(&source.name)?;
    let key_kind = source.key();

    let mut slots: Vec<Slot> = Vec::new();
    let mut index: HashMap<Key, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for row in &table.rows {
        let source_id = table.int(row, id_idx)?;
        let name = table.text(row, name_idx);
        let canonical_id = table.int(row, canonical_idx)?;

        let key = match (key_kind, source_id, &name) {
            (SourceKey::Id, Some(id), _) => Key::Id(id),
            (SourceKey::IdAndName, Some(id), Some(name)) => Key::IdName(id, name.clone()),
            _ => Key::Blank(source_id, name.clone(), canonical_id),
        };

        let Some(i) = index.get(&key).copied() else {
            index.insert(key, slots.len());
            slots.push(Slot {
                line: row.line,
                source_id,
                name,
                canonical_id,
            });
            continue;
        };

        let slot = &mut slots[i];
        let key_label = key.display();

        if let Some(b) = name {
            match slot.name {
                Some(ref a) if *a != b => conflicts.push(Conflict {
                    key: key_label.clone(),
                    field: "name",
                    first: a.clone(),
                    second: b,
                    line: row.line,
                }),
                Some(_) => {}
                None => slot.name = Some(b),
            }
        }

        match (slot.canonical_id, canonical_id) {
            (Some(a), Some(b)) if a != b => conflicts.push(Conflict {
                key: key_label,
                field: "canonical id",
                first: a.to_string(),
                second: b.to_string(),
                line: row.line,
            }),
            (None, Some(b)) => slot.canonical_id = Some(b),
            _ => {}
        }
    }

    if !conflicts.is_empty() {
        return Err(ReconError::Conflicts {
            kind: table.kind,
            table: source.table.clone(),
            conflicts,
        });
    }

    let mut out = SourceProjection::default();
    for slot in slots {
        match slot.into_result() {
            Ok(record) => out.records.push(record),
            Err(row) => out.incomplete.push(row),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CrossRefRow};
    use pudl_core::EntityKind;

    fn entity(name_in_key: bool) -> EntityConfig {
        EntityConfig {
            kind: EntityKind::Plant,
            sheet: "plants_output".into(),
            table: None,
            id: "plant_id".into(),
            name: "plant_name".into(),
            sources: vec![SourceConfig {
                source: "ferc1".into(),
                table: "plants_ferc1".into(),
                id: "respondent_id_ferc1".into(),
                name: "plant_name_ferc1".into(),
                store_id: None,
                store_name: None,
                name_in_key,
                id_references: None,
            }],
        }
    }

    fn cell_int(v: Option<i64>) -> Cell {
        v.map(Cell::Int).unwrap_or(Cell::Missing)
    }

    fn cell_text(v: Option<&str>) -> Cell {
        v.map(|s| Cell::Text(s.into())).unwrap_or(Cell::Missing)
    }

    /// Rows of (plant_id, plant_name, respondent_id, plant_name_ferc1).
    fn table(rows: &[(Option<i64>, Option<&str>, Option<i64>, Option<&str>)]) -> CrossRefTable {
        CrossRefTable {
            kind: EntityKind::Plant,
            sheet: "plants_output".into(),
            columns: vec![
                "plant_id".into(),
                "plant_name".into(),
                "respondent_id_ferc1".into(),
                "plant_name_ferc1".into(),
            ],
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, (pid, pname, rid, rname))| CrossRefRow {
                    line: i + 2,
                    cells: vec![cell_int(*pid), cell_text(*pname), cell_int(*rid), cell_text(*rname)],
                })
                .collect(),
        }
    }

    #[test]
    fn canonical_dedup_keeps_first() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA 1")),
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA 2")),
            (Some(2), Some("Beta"), None, None),
        ]);
        let out = project_canonical(&entity(false), &t).unwrap();
        assert_eq!(
            out,
            vec![
                CanonicalEntity { id: 1, name: "Alpha".into() },
                CanonicalEntity { id: 2, name: "Beta".into() },
            ]
        );
    }

    #[test]
    fn canonical_name_conflict_fails() {
        let t = table(&[
            (Some(1), Some("Alpha"), None, None),
            (Some(1), Some("Alpha Station"), None, None),
        ]);
        let err = project_canonical(&entity(false), &t).unwrap_err();
        match err {
            ReconError::Conflicts { table, conflicts, .. } => {
                assert_eq!(table, "plants");
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].key, "1");
                assert_eq!(conflicts[0].line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn canonical_blank_id_is_malformed() {
        let t = table(&[(None, Some("Alpha"), Some(10), Some("A"))]);
        let err = project_canonical(&entity(false), &t).unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("row 2: canonical column 'plant_id' is blank"));
    }

    #[test]
    fn source_dedup_by_id() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(2), Some("Beta"), Some(11), Some("BETA")),
        ]);
        let e = entity(false);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.records.len(), 2);
        assert!(out.incomplete.is_empty());
        assert_eq!(out.records[1], SourceRecord { source_id: 11, name: "BETA".into(), canonical_id: 2 });
    }

    #[test]
    fn source_id_with_two_names_conflicts() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(2), Some("Beta"), Some(10), Some("BETA")),
        ]);
        let e = entity(false);
        let err = project_source(&e, &e.sources[0], &t).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("plants_ferc1"));
        assert!(msg.contains("id 10 has name 'ALPHA' and 'BETA'"));
        assert!(msg.contains("id 10 has canonical id '1' and '2'"));
    }

    #[test]
    fn composite_key_allows_many_names_per_id() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(2), Some("Beta"), Some(10), Some("BETA")),
            (Some(2), Some("Beta"), Some(10), Some("BETA")),
        ]);
        let e = entity(true);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn composite_key_link_conflict() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(2), Some("Beta"), Some(10), Some("ALPHA")),
        ]);
        let e = entity(true);
        let err = project_source(&e, &e.sources[0], &t).unwrap_err();
        assert!(err.to_string().contains("id 10/\"ALPHA\" has canonical id '1' and '2'"));
    }

    #[test]
    fn blank_keys_are_not_collapsed() {
        let t = table(&[
            (Some(1), Some("Alpha"), None, None),
            (Some(2), Some("Beta"), None, None),
            (Some(3), Some("Gamma"), Some(12), Some("GAMMA")),
        ]);
        let e = entity(false);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.incomplete.len(), 2);
        assert_eq!(out.incomplete[0].line, 2);
        assert_eq!(out.incomplete[1].canonical_id, Some(2));
    }

    #[test]
    fn identical_blank_rows_count_once() {
        // Plant 2 has two units in the source but no source record of its own
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
            (Some(2), Some("Beta"), None, None),
            (Some(2), Some("Beta"), None, None),
            (Some(3), Some("Gamma"), None, None),
        ]);
        let e = entity(false);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.records.len(), 1);
        let lines: Vec<usize> = out.incomplete.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn blank_rows_differing_in_a_value_stay_separate() {
        let t = table(&[
            (Some(2), Some("Beta"), None, Some("BETA 1")),
            (Some(2), Some("Beta"), None, Some("BETA 2")),
        ]);
        let e = entity(true);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.incomplete.len(), 2);
    }

    #[test]
    fn duplicate_fills_blank_name() {
        let t = table(&[
            (Some(1), Some("Alpha"), Some(10), None),
            (Some(1), Some("Alpha"), Some(10), Some("ALPHA")),
        ]);
        let e = entity(false);
        let out = project_source(&e, &e.sources[0], &t).unwrap();
        assert_eq!(out.records, vec![SourceRecord { source_id: 10, name: "ALPHA".into(), canonical_id: 1 }]);
        assert!(out.incomplete.is_empty());
    }
}
