//! `pudl load|check|validate|status|schema`: the pipeline commands.

use std::path::{Path, PathBuf};

use serde::Serialize;

use pudl_config::Settings;
use pudl_core::EntityKind;
use pudl_io::{crossref, LoadReport, ReplaceMode, StoreError};
use pudl_recon::model::{ReconMeta, ReconResult, ReconSummary};
use pudl_recon::{MappingConfig, ReconError};

use crate::exit_codes::{load_exit_code, recon_exit_code, store_exit_code, EXIT_ERROR, EXIT_PERSISTENCE};
use crate::CliError;

/// Mapping used when neither `--mapping` nor `input.mapping` is given.
const BUILTIN_MAPPING: &str = include_str!("../../../mappings/eia923_ferc1.mapping.toml");

struct Mapping {
    config: MappingConfig,
    /// Where the config came from, for messages.
    origin: String,
}

fn load_mapping(flag: Option<PathBuf>, settings: &Settings) -> Result<Mapping, CliError> {
    let Some(path) = flag.or_else(|| settings.input.mapping.clone()) else {
        let config = MappingConfig::from_toml(BUILTIN_MAPPING)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("built-in mapping: {e}")))?;
        return Ok(Mapping { config, origin: "built-in eia923_ferc1".to_string() });
    };
    read_mapping(&path)
}

fn read_mapping(path: &Path) -> Result<Mapping, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("cannot read mapping {}: {e}", path.display())))?;
    let config = MappingConfig::from_toml(&text)
        .map_err(|e| CliError::new(recon_exit_code(&e), format!("{}: {e}", path.display())))?;
    Ok(Mapping { config, origin: path.display().to_string() })
}

/// Read the cross-reference and reconcile it. Nothing is written.
fn reconcile(config: &MappingConfig, input: &Path) -> Result<ReconResult, CliError> {
    if !input.exists() {
        return Err(CliError::args(format!("input not found: {}", input.display())));
    }
    let tables = crossref::load(input, config).map_err(|e| CliError::new(load_exit_code(&e), e.to_string()))?;
    pudl_recon::run(config, tables).map_err(recon_error)
}

fn recon_error(e: ReconError) -> CliError {
    let err = CliError::new(recon_exit_code(&e), e.to_string());
    match e {
        ReconError::CurationIncomplete { .. } => err.with_hint(
            "complete or remove the listed rows in the cross-reference, or raise policy.max_incomplete_rows",
        ),
        ReconError::Conflicts { .. } => {
            err.with_hint("every id must map to one name and one canonical entity")
        }
        _ => err,
    }
}

fn store_error(e: StoreError) -> CliError {
    let err = CliError::new(store_exit_code(&e), e.to_string());
    match e {
        StoreError::NotEmpty { .. } => err.with_hint("pass --replace to drop and reload it"),
        StoreError::Missing { .. } | StoreError::NotLoaded { .. } => err.with_hint("run `pudl load` first"),
        _ => err,
    }
}

/// Serialize once; write to `output` and/or stdout.
fn emit_json(value: &impl Serialize, json_output: bool, output_file: Option<&Path>) -> Result<(), CliError> {
    if !json_output && output_file.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

/// Human summary to stderr
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "mapping '{}': {} canonical entities, {} source records, {} incomplete row(s) dropped",
        result.meta.mapping_name, s.canonical_total, s.source_records_total, s.dropped_total,
    );
    for entity in &s.entities {
        eprintln!("  {} ({}): {} canonical", entity.kind, entity.table, entity.canonical);
        for source in &entity.sources {
            let dropped = match source.dropped.as_slice() {
                [] => String::new(),
                rows => format!(
                    ", dropped row(s) {}",
                    rows.iter().map(|r| r.line.to_string()).collect::<Vec<_>>().join(", ")
                ),
            };
            eprintln!("    {:<8} {}: {} records{}", source.source, source.table, source.records, dropped);
        }
    }
}

// ============================================================================
// load
// ============================================================================

#[derive(Serialize)]
struct LoadOutput<'a> {
    store: String,
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    load: &'a LoadReport,
}

pub fn cmd_load(
    settings: &Settings,
    mapping: Option<PathBuf>,
    input: Option<PathBuf>,
    store: Option<PathBuf>,
    replace: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let mapping = load_mapping(mapping, settings)?;
    let input = input.or_else(|| settings.input.crossref.clone()).ok_or_else(|| {
        CliError::args("no cross-reference input")
            .with_hint("pass --input or set input.crossref in the settings file")
    })?;
    let store = store.unwrap_or_else(|| settings.store_path());
    log::info!("mapping {}, input {}, store {}", mapping.origin, input.display(), store.display());

    // Nothing touches the store until reconciliation has succeeded
    let result = reconcile(&mapping.config, &input)?;

    if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::new(EXIT_PERSISTENCE, format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let mode = if replace { ReplaceMode::Replace } else { ReplaceMode::IfEmpty };
    let report = pudl_io::replace(
        &store,
        &mapping.config.schema(),
        &result,
        &mapping.config.reference_data(),
        mode,
    )
    .map_err(store_error)?;

    emit_json(
        &LoadOutput {
            store: store.display().to_string(),
            meta: &result.meta,
            summary: &result.summary,
            load: &report,
        },
        json_output,
        output_file.as_deref(),
    )?;

    print_summary(&result);
    eprintln!(
        "loaded {} rows into {} tables in {}{}",
        report.rows_written,
        report.tables_created,
        store.display(),
        if report.replaced.is_empty() { "" } else { " (replaced previous content)" },
    );
    Ok(())
}

// ============================================================================
// check
// ============================================================================

pub fn cmd_check(
    settings: &Settings,
    input: PathBuf,
    mapping: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let mapping = load_mapping(mapping, settings)?;
    let result = reconcile(&mapping.config, &input)?;
    emit_json(&result, json_output, None)?;
    print_summary(&result);
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(mapping: PathBuf) -> Result<(), CliError> {
    let Mapping { config, .. } = read_mapping(&mapping)?;
    let sources: usize = config.entities.iter().map(|e| e.sources.len()).sum();
    eprintln!(
        "valid: mapping '{}' with {} entit{}, {} source table(s), {} incomplete row(s) tolerated per source",
        config.name,
        config.entities.len(),
        if config.entities.len() == 1 { "y" } else { "ies" },
        sources,
        config.policy.max_incomplete_rows,
    );
    Ok(())
}

// ============================================================================
// status
// ============================================================================

#[derive(Serialize)]
struct SourceStatus {
    source: String,
    table: String,
    records: usize,
}

#[derive(Serialize)]
struct EntityStatus {
    kind: EntityKind,
    table: String,
    canonical: usize,
    sources: Vec<SourceStatus>,
}

#[derive(Serialize)]
struct StatusOutput {
    store: String,
    meta: std::collections::BTreeMap<String, String>,
    entities: Vec<EntityStatus>,
}

pub fn cmd_status(
    settings: &Settings,
    store: Option<PathBuf>,
    mapping: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let mapping = load_mapping(mapping, settings)?;
    let store = store.unwrap_or_else(|| settings.store_path());

    let snapshot = pudl_io::read_snapshot(&store, &mapping.config.schema()).map_err(|e| match e {
        StoreError::Sqlite(_) => store_error(e)
            .with_hint(format!("was the store loaded with a different mapping than {}?", mapping.origin)),
        e => store_error(e),
    })?;

    let status = StatusOutput {
        store: store.display().to_string(),
        entities: snapshot
            .entities
            .iter()
            .map(|e| EntityStatus {
                kind: e.kind,
                table: e.table.clone(),
                canonical: e.canonical.len(),
                sources: e
                    .sources
                    .iter()
                    .map(|s| SourceStatus {
                        source: s.source.clone(),
                        table: s.table.clone(),
                        records: s.records.len(),
                    })
                    .collect(),
            })
            .collect(),
        meta: snapshot.meta,
    };

    if json_output {
        return emit_json(&status, true, None);
    }

    let meta = |key: &str| status.meta.get(key).map(String::as_str).unwrap_or("?");
    println!("store:    {}", status.store);
    println!("mapping:  {}", meta("mapping_name"));
    println!("loaded:   {} (engine {})", meta("loaded_at"), meta("engine_version"));
    for entity in &status.entities {
        println!("{} ({}): {} canonical", entity.kind, entity.table, entity.canonical);
        for source in &entity.sources {
            println!("  {:<8} {}: {} records", source.source, source.table, source.records);
        }
    }
    Ok(())
}

// ============================================================================
// schema
// ============================================================================

pub fn cmd_schema(settings: &Settings, mapping: Option<PathBuf>) -> Result<(), CliError> {
    let mapping = load_mapping(mapping, settings)?;
    for ddl in mapping.config.schema().create_statements() {
        println!("{ddl};\n");
    }
    Ok(())
}
