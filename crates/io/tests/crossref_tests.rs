use std::path::{Path, PathBuf};

use pudl_io::crossref;
use pudl_io::LoadError;
use pudl_recon::model::{Cell, CrossRefTable};
use pudl_recon::MappingConfig;
use rust_xlsxwriter::Workbook;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn mapping() -> MappingConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("eia923_ferc1.mapping.toml")).unwrap();
    MappingConfig::from_toml(&toml).unwrap()
}

enum V<'a> {
    S(&'a str),
    N(f64),
    Blank,
}

/// Author a workbook with one sheet per `(name, first_row, rows)`.
fn write_workbook(path: &Path, sheets: &[(&str, u32, Vec<Vec<V>>)]) {
    let mut workbook = Workbook::new();
    for (name, first_row, rows) in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (r, c) = (first_row + r as u32, c as u16);
                match value {
                    V::S(s) => {
                        ws.write_string(r, c, *s).unwrap();
                    }
                    V::N(n) => {
                        ws.write_number(r, c, *n).unwrap();
                    }
                    V::Blank => {}
                }
            }
        }
    }
    workbook.save(path).unwrap();
}

fn utilities_sheet(second_ferc1_id: f64) -> Vec<Vec<V<'static>>> {
    use V::*;
    vec![
        vec![
            S("utility_id"),
            S("utility_name"),
            S("respondent_id_ferc1"),
            S("respondent_name_ferc1"),
            S("operator_id_eia923"),
            S("operator_name_eia923"),
        ],
        vec![N(1.0), S("Alabama Power"), N(2.0), S("Alabama Power Company"), N(195.0), S("Alabama Power Co")],
        vec![N(2.0), S("Duke Energy"), N(second_ferc1_id), S("Duke Energy Corp"), N(5416.0), S("Duke Energy")],
        vec![N(3.0), S("Tiny Coop"), Blank, Blank, N(18642.0), S("Tiny Electric Coop")],
    ]
}

fn plants_sheet() -> Vec<Vec<V<'static>>> {
    use V::*;
    vec![
        vec![S("plant_id"), S("plant_name"), S("plant_id_eia923"), S("plant_name_eia923")],
        vec![N(1.0), S(" Barry "), N(3.0), S("Barry Steam")],
    ]
}

fn table<'a>(tables: &'a [CrossRefTable], sheet: &str) -> &'a CrossRefTable {
    tables.iter().find(|t| t.sheet == sheet).unwrap()
}

// -------------------------------------------------------------------------
// Workbook input
// -------------------------------------------------------------------------

#[test]
fn workbook_floats_become_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crossref.xlsx");
    write_workbook(
        &path,
        &[("utilities_output", 0, utilities_sheet(159.0)), ("plants_output", 2, plants_sheet())],
    );

    let input = crossref::load(&path, &mapping()).unwrap();
    let utilities = table(&input.tables, "utilities_output");
    assert_eq!(utilities.rows.len(), 3);
    assert_eq!(utilities.rows[0].cells[0], Cell::Int(1));
    assert_eq!(utilities.rows[1].cells[2], Cell::Int(159));
    assert_eq!(utilities.rows[2].cells[2], Cell::Missing);

    // Header found on the first non-empty row; line numbers stay sheet rows
    let plants = table(&input.tables, "plants_output");
    assert_eq!(plants.rows[0].line, 4);
    assert_eq!(plants.rows[0].cells[1], Cell::Text("Barry".into()));
}

#[test]
fn workbook_fractional_id_names_sheet_column_and_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crossref.xlsx");
    write_workbook(
        &path,
        &[("utilities_output", 0, utilities_sheet(159.5)), ("plants_output", 0, plants_sheet())],
    );

    let err = crossref::load(&path, &mapping()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "sheet 'utilities_output', row 3: column 'respondent_id_ferc1' expects an integer id, found 159.5"
    );
}

#[test]
fn workbook_missing_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crossref.xlsx");
    write_workbook(&path, &[("utilities_output", 0, utilities_sheet(159.0))]);

    let err = crossref::load(&path, &mapping()).unwrap_err();
    assert!(matches!(err, LoadError::MissingSheet { ref sheet, .. } if sheet == "plants_output"));
}

// -------------------------------------------------------------------------
// CSV directory input
// -------------------------------------------------------------------------

#[test]
fn csv_directory_loads_mapped_columns() {
    let input = crossref::load(&fixtures_dir().join("crossref"), &mapping()).unwrap();
    let utilities = table(&input.tables, "utilities_output");

    // Unmapped `notes` column is not carried
    assert_eq!(
        utilities.columns,
        vec![
            "utility_id",
            "utility_name",
            "respondent_id_ferc1",
            "respondent_name_ferc1",
            "operator_id_eia923",
            "operator_name_eia923",
        ]
    );
    let lines: Vec<usize> = utilities.rows.iter().map(|r| r.line).collect();
    assert_eq!(lines, vec![2, 3, 5]);
    assert_eq!(utilities.rows[1].cells[4], Cell::Int(5416));
    assert_eq!(utilities.rows[2].cells[5], Cell::Text("Tiny Electric Coop".into()));
}

#[test]
fn csv_fractional_id_is_rejected() {
    let err = crossref::load(&fixtures_dir().join("bad_ids"), &mapping()).unwrap_err();
    match err {
        LoadError::NotAnId { sheet, line, column, found } => {
            assert_eq!(sheet, "utilities_output");
            assert_eq!(line, 3);
            assert_eq!(column, "respondent_id_ferc1");
            assert_eq!(found, "'159.5'");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn csv_duplicate_mapped_header_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("utilities_output.csv"),
        "utility_id,utility_name,respondent_id_ferc1,respondent_name_ferc1,operator_id_eia923,operator_name_eia923,utility_name\n",
    )
    .unwrap();
    std::fs::copy(
        fixtures_dir().join("crossref/plants_output.csv"),
        dir.path().join("plants_output.csv"),
    )
    .unwrap();

    let err = crossref::load(dir.path(), &mapping()).unwrap_err();
    assert!(matches!(err, LoadError::DuplicateHeader { ref column, .. } if column == "utility_name"));
}

#[test]
fn csv_missing_column() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("utilities_output.csv"), "utility_id,utility_name\n1,A\n").unwrap();
    std::fs::copy(
        fixtures_dir().join("crossref/plants_output.csv"),
        dir.path().join("plants_output.csv"),
    )
    .unwrap();

    let err = crossref::load(dir.path(), &mapping()).unwrap_err();
    assert_eq!(err.to_string(), "sheet 'utilities_output': missing column 'respondent_id_ferc1'");
}

#[test]
fn empty_csv_has_no_header() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("utilities_output.csv"), "\n,,\n").unwrap();
    let err = crossref::load(dir.path(), &mapping()).unwrap_err();
    assert!(matches!(err, LoadError::EmptySheet { .. }));
}

#[test]
fn unsupported_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crossref.txt");
    std::fs::write(&path, "utility_id\n").unwrap();
    let err = crossref::load(&path, &mapping()).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedInput { .. }));
}
