use std::collections::{HashMap, HashSet};

use crate::config::{EntityConfig, MappingConfig, Policy};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::model::{
    CrossRefTable, ReconInput, ReconMeta, ReconResult, Reconciled, ReconciledEntity, SourceSet,
};
use crate::project::{project_canonical, project_source};

/// Reconcile the cross-reference per mapping. Returns validated record sets +
/// summary, or the first defect that makes the input unloadable.
///
/// Takes the input by value: each raw table is dropped as soon as its
/// projections are built.
pub fn run(config: &MappingConfig, mut input: ReconInput) -> Result<ReconResult, ReconError> {
    let mut entities = Vec::with_capacity(config.entities.len());

    for entity in &config.entities {
        let table = input.take(entity.kind).ok_or_else(|| ReconError::MissingTable {
            kind: entity.kind,
            sheet: entity.sheet.clone(),
        })?;
        entities.push(reconcile_entity(entity, table, &config.policy)?);
    }

    let reconciled = Reconciled { entities };
    verify_id_references(&reconciled)?;

    let summary = compute_summary(&reconciled);
    log::info!(
        "reconciled '{}': {} canonical entities, {} source records, {} incomplete rows dropped",
        config.name,
        summary.canonical_total,
        summary.source_records_total,
        summary.dropped_total,
    );

    Ok(ReconResult {
        meta: ReconMeta {
            mapping_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        reconciled,
    })
}

fn reconcile_entity(
    entity: &EntityConfig,
    table: CrossRefTable,
    policy: &Policy,
) -> Result<ReconciledEntity, ReconError> {
    let canonical = project_canonical(entity, &table)?;
    let canonical_ids: HashSet<i64> = canonical.iter().map(|c| c.id).collect();
    log::debug!("{}: {} canonical entities from sheet '{}'", entity.kind, canonical.len(), table.sheet);

    let mut sources = Vec::with_capacity(entity.sources.len());
    for source in &entity.sources {
        let projection = project_source(entity, source, &table)?;

        if projection.incomplete.len() > policy.max_incomplete_rows {
            return Err(ReconError::CurationIncomplete {
                kind: entity.kind,
                table: source.table.clone(),
                lines: projection.incomplete.iter().map(|r| r.line).collect(),
                limit: policy.max_incomplete_rows,
            });
        }
        for row in &projection.incomplete {
            log::warn!(
                "{} table '{}': dropping incomplete row {} (id {:?}, name {:?}, canonical {:?})",
                entity.kind,
                source.table,
                row.line,
                row.source_id,
                row.name,
                row.canonical_id,
            );
        }

        if let Some(orphan) = projection.records.iter().find(|r| !canonical_ids.contains(&r.canonical_id)) {
            return Err(ReconError::IntegrityViolation {
                kind: entity.kind,
                table: source.table.clone(),
                column: entity.kind.link_column().to_string(),
                value: orphan.canonical_id,
                target: entity.table().to_string(),
            });
        }

        log::debug!("{} table '{}': {} records", entity.kind, source.table, projection.records.len());
        sources.push(SourceSet {
            def: source.to_table(),
            records: projection.records,
            dropped: projection.incomplete,
        });
    }

    Ok(ReconciledEntity {
        kind: entity.kind,
        table: entity.table().to_string(),
        canonical,
        sources,
    })
}

/// Every id in a table declaring `id_references` must exist in the referenced
/// table's final (post-drop) record set.
fn verify_id_references(reconciled: &Reconciled) -> Result<(), ReconError> {
    let mut ids_by_table: HashMap<&str, HashSet<i64>> = HashMap::new();
    for entity in &reconciled.entities {
        for set in &entity.sources {
            ids_by_table.insert(
                set.def.table.as_str(),
                set.records.iter().map(|r| r.source_id).collect(),
            );
        }
    }

    for entity in &reconciled.entities {
        for set in &entity.sources {
            let Some(ref target) = set.def.id_references else {
                continue;
            };
            let known = ids_by_table.get(target.as_str());
            let missing = set
                .records
                .iter()
                .find(|r| !known.is_some_and(|ids| ids.contains(&r.source_id)));
            if let Some(record) = missing {
                return Err(ReconError::IntegrityViolation {
                    kind: entity.kind,
                    table: set.def.table.clone(),
                    column: set.def.id_column.clone(),
                    value: record.source_id,
                    target: target.clone(),
                });
            }
        }
    }
    Ok(())
}
