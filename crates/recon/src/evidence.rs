use crate::model::{EntitySummary, ReconSummary, Reconciled, SourceSummary};

/// Compute summary statistics from reconciled record sets.
pub fn compute_summary(reconciled: &Reconciled) -> ReconSummary {
    let mut canonical_total = 0;
    let mut source_records_total = 0;
    let mut dropped_total = 0;

    let entities = reconciled
        .entities
        .iter()
        .map(|entity| {
            canonical_total += entity.canonical.len();
            let sources = entity
                .sources
                .iter()
                .map(|set| {
                    source_records_total += set.records.len();
                    dropped_total += set.dropped.len();
                    SourceSummary {
                        source: set.def.source.clone(),
                        table: set.def.table.clone(),
                        records: set.records.len(),
                        dropped: set.dropped.clone(),
                    }
                })
                .collect();
            EntitySummary {
                kind: entity.kind,
                table: entity.table.clone(),
                canonical: entity.canonical.len(),
                sources,
            }
        })
        .collect();

    ReconSummary {
        canonical_total,
        source_records_total,
        dropped_total,
        entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IncompleteRow, ReconciledEntity, SourceSet};
    use pudl_core::{CanonicalEntity, EntityKind, SourceKey, SourceRecord, SourceTable};

    fn source_set(table: &str, records: usize, dropped: usize) -> SourceSet {
        SourceSet {
            def: SourceTable {
                source: "ferc1".into(),
                table: table.into(),
                id_column: "respondent_id_ferc1".into(),
                name_column: "respondent_name_ferc1".into(),
                key: SourceKey::Id,
                id_references: None,
            },
            records: (0..records as i64)
                .map(|i| SourceRecord {
                    source_id: i,
                    name: format!("R{i}"),
                    canonical_id: 1,
                })
                .collect(),
            dropped: (0..dropped)
                .map(|i| IncompleteRow {
                    line: i + 10,
                    source_id: None,
                    name: None,
                    canonical_id: Some(1),
                })
                .collect(),
        }
    }

    #[test]
    fn summary_totals() {
        let reconciled = Reconciled {
            entities: vec![
                ReconciledEntity {
                    kind: EntityKind::Utility,
                    table: "utilities".into(),
                    canonical: vec![CanonicalEntity { id: 1, name: "A".into() }],
                    sources: vec![source_set("utilities_ferc1", 3, 1), source_set("utilities_eia923", 2, 0)],
                },
                ReconciledEntity {
                    kind: EntityKind::Plant,
                    table: "plants".into(),
                    canonical: vec![
                        CanonicalEntity { id: 1, name: "P".into() },
                        CanonicalEntity { id: 2, name: "Q".into() },
                    ],
                    sources: vec![source_set("plants_ferc1", 4, 1)],
                },
            ],
        };

        let summary = compute_summary(&reconciled);
        assert_eq!(summary.canonical_total, 3);
        assert_eq!(summary.source_records_total, 9);
        assert_eq!(summary.dropped_total, 2);
        assert_eq!(summary.entities[0].sources[1].table, "utilities_eia923");
        assert_eq!(summary.entities[1].sources[0].dropped[0].line, 10);
    }

    #[test]
    fn empty_summary() {
        let summary = compute_summary(&Reconciled::default());
        assert_eq!(summary.canonical_total, 0);
        assert!(summary.entities.is_empty());
    }
}
