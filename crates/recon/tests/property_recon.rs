// Property-based tests for the reconciliation engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use pudl_core::EntityKind;
use pudl_recon::model::{Cell, CrossRefRow, CrossRefTable, ReconInput};
use pudl_recon::{run, MappingConfig, ReconError};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const MAPPING: &str = r#"
name = "Property"

[[entities]]
kind = "utility"
sheet = "utilities_output"
id = "utility_id"
name = "utility_name"

[[entities.sources]]
source = "left"
table = "utilities_left"
id = "left_id"
name = "left_name"

[[entities.sources]]
source = "right"
table = "utilities_right"
id = "right_id"
name = "right_name"
"#;

/// One curated row: canonical id plus an optional source id per source.
/// Source ids may repeat across canonical ids to provoke conflicts.
#[derive(Debug, Clone)]
struct Row {
    canonical: i64,
    left: Option<i64>,
    right: Option<i64>,
}

fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    proptest::collection::vec(
        (
            1i64..40,
            proptest::option::weighted(0.85, 100i64..160),
            proptest::option::weighted(0.85, 500i64..560),
        ),
        1..30,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .map(|(canonical, left, right)| Row { canonical, left, right })
            .collect()
    })
}

/// Names are derived from ids so that duplicate ids never disagree on names.
fn to_table(rows: &[Row]) -> CrossRefTable {
    let id = |v: Option<i64>| v.map(Cell::Int).unwrap_or(Cell::Missing);
    let name = |prefix: &str, v: Option<i64>| {
        v.map(|n| Cell::Text(format!("{prefix} {n}"))).unwrap_or(Cell::Missing)
    };
    CrossRefTable {
        kind: EntityKind::Utility,
        sheet: "utilities_output".into(),
        columns: ["utility_id", "utility_name", "left_id", "left_name", "right_id", "right_name"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, r)| CrossRefRow {
                line: i + 2,
                cells: vec![
                    Cell::Int(r.canonical),
                    Cell::Text(format!("Utility {}", r.canonical)),
                    id(r.left),
                    name("L", r.left),
                    id(r.right),
                    name("R", r.right),
                ],
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(config_256())]

    /// A successful run yields unique keys and complete references. A failed
    /// run is explained by a conflict or by too many unmatched rows.
    #[test]
    fn reconciled_sets_are_unique_and_referentially_complete(rows in arb_rows()) {
        let config = MappingConfig::from_toml(MAPPING).unwrap();
        let input = ReconInput { tables: vec![to_table(&rows)] };

        match run(&config, input) {
            Ok(result) => {
                let utilities = result.reconciled.entities[0].canonical.clone();
                let ids: HashSet<i64> = utilities.iter().map(|c| c.id).collect();
                prop_assert_eq!(ids.len(), utilities.len());
                let expected: HashSet<i64> = rows.iter().map(|r| r.canonical).collect();
                prop_assert_eq!(&ids, &expected);

                for set in &result.reconciled.entities[0].sources {
                    let keys: HashSet<i64> = set.records.iter().map(|r| r.source_id).collect();
                    prop_assert_eq!(keys.len(), set.records.len());
                    for record in &set.records {
                        prop_assert!(ids.contains(&record.canonical_id));
                    }
                    prop_assert!(set.dropped.len() <= 1);
                }
            }
            Err(ReconError::Conflicts { conflicts, .. }) => {
                prop_assert!(!conflicts.is_empty());
                for c in &conflicts {
                    prop_assert_eq!(c.field, "canonical id");
                }
            }
            Err(ReconError::CurationIncomplete { lines, limit, .. }) => {
                prop_assert!(lines.len() > limit);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Row order never changes which records survive, only their order.
    #[test]
    fn outcome_is_independent_of_row_order(rows in arb_rows()) {
        let config = MappingConfig::from_toml(MAPPING).unwrap();
        let forward = run(&config, ReconInput { tables: vec![to_table(&rows)] });
        let reversed_rows: Vec<Row> = rows.iter().rev().cloned().collect();
        let backward = run(&config, ReconInput { tables: vec![to_table(&reversed_rows)] });

        match (forward, backward) {
            (Ok(a), Ok(b)) => {
                for (sa, sb) in a.reconciled.entities[0].sources.iter().zip(&b.reconciled.entities[0].sources) {
                    let mut ka: Vec<(i64, i64)> = sa.records.iter().map(|r| (r.source_id, r.canonical_id)).collect();
                    let mut kb: Vec<(i64, i64)> = sb.records.iter().map(|r| (r.source_id, r.canonical_id)).collect();
                    ka.sort_unstable();
                    kb.sort_unstable();
                    prop_assert_eq!(ka, kb);
                }
            }
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "order changed outcome: {:?} vs {:?}", a.is_ok(), b.is_ok()),
        }
    }
}
