use std::collections::HashSet;

use pudl_core::schema::is_identifier;
use pudl_core::{reference, EntityKind, EntitySchema, ReferenceData, Schema, SourceKey, SourceTable};
use serde::Deserialize;

use crate::error::ReconError;
use crate::model::ColumnType;

/// Tables the store keeps for its own bookkeeping.
pub const RESERVED_TABLES: &[&str] = &["pudl_meta", "pudl_tables"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// The declared shape of the curated cross-reference: which sheets hold which
/// entity kinds, and which column pairs belong to which source.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub name: String,
    #[serde(default)]
    pub policy: Policy,
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub reference: ReferenceOverrides,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    /// Incomplete rows tolerated per per-source projection before the run
    /// aborts. The curated mapping carries a single "unmatched" placeholder
    /// per source, hence the default of 1.
    #[serde(default = "default_max_incomplete")]
    pub max_incomplete_rows: usize,
}

fn default_max_incomplete() -> usize {
    1
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_incomplete_rows: default_max_incomplete(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities + sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    pub kind: EntityKind,
    /// Sheet (or CSV file stem) holding this entity's cross-reference.
    pub sheet: String,
    /// Store table for the canonical entities. Defaults per kind.
    #[serde(default)]
    pub table: Option<String>,
    /// Cross-reference column with the canonical id.
    pub id: String,
    /// Cross-reference column with the canonical name.
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source: String,
    pub table: String,
    /// Cross-reference column with the source-native id.
    pub id: String,
    /// Cross-reference column with the source-native name.
    pub name: String,
    /// Store column names. Default to the cross-reference column names.
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    /// Key records by (id, name) instead of id alone.
    #[serde(default)]
    pub name_in_key: bool,
    /// Source table whose id column this source's id references.
    #[serde(default)]
    pub id_references: Option<String>,
}

impl EntityConfig {
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or_else(|| self.kind.canonical_table())
    }

    /// Every cross-reference column this entity reads, with its type.
    pub fn columns(&self) -> Vec<(String, ColumnType)> {
        let mut out: Vec<(String, ColumnType)> = Vec::new();
        let mut push = |name: &str, ty: ColumnType| {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.to_string(), ty));
            }
        };
        push(&self.id, ColumnType::Id);
        push(&self.name, ColumnType::Name);
        for source in &self.sources {
            push(&source.id, ColumnType::Id);
            push(&source.name, ColumnType::Name);
        }
        out
    }
}

impl SourceConfig {
    pub fn store_id(&self) -> &str {
        self.store_id.as_deref().unwrap_or(&self.id)
    }

    pub fn store_name(&self) -> &str {
        self.store_name.as_deref().unwrap_or(&self.name)
    }

    pub fn key(&self) -> SourceKey {
        if self.name_in_key {
            SourceKey::IdAndName
        } else {
            SourceKey::Id
        }
    }

    pub fn to_table(&self) -> SourceTable {
        SourceTable {
            source: self.source.clone(),
            table: self.table.clone(),
            id_column: self.store_id().to_string(),
            name_column: self.store_name().to_string(),
            key: self.key(),
            id_references: self.id_references.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceOverrides {
    #[serde(default)]
    pub fuels: Option<Vec<String>>,
    #[serde(default)]
    pub fuel_units: Option<Vec<String>>,
    #[serde(default)]
    pub prime_movers: Option<Vec<String>>,
    #[serde(default)]
    pub rto_iso: Option<Vec<String>>,
    #[serde(default)]
    pub years: Option<YearRange>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct YearRange {
    pub first: i64,
    pub last: i64,
}

/// Years a reference override may name.
pub const YEAR_BOUNDS: std::ops::RangeInclusive<i64> = 1..=9999;

impl ReferenceOverrides {
    fn validate(&self) -> Result<(), ReconError> {
        let sets = [
            ("fuels", &self.fuels),
            ("fuel_units", &self.fuel_units),
            ("prime_movers", &self.prime_movers),
            ("rto_iso", &self.rto_iso),
        ];
        for (set, values) in sets {
            let Some(values) = values else { continue };
            let mut seen = HashSet::new();
            for value in values {
                if value.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!("reference {set}: blank entry")));
                }
                if !seen.insert(value.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "reference {set}: '{value}' is listed more than once"
                    )));
                }
            }
        }

        if let Some(years) = self.years {
            if years.first > years.last {
                return Err(ReconError::ConfigValidation(format!(
                    "reference years: first ({}) is after last ({})",
                    years.first, years.last
                )));
            }
            if !YEAR_BOUNDS.contains(&years.first) || !YEAR_BOUNDS.contains(&years.last) {
                return Err(ReconError::ConfigValidation(format!(
                    "reference years: {}..={} is outside {}..={}",
                    years.first,
                    years.last,
                    YEAR_BOUNDS.start(),
                    YEAR_BOUNDS.end()
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MappingConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MappingConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(msg));

        if self.entities.is_empty() {
            return invalid("at least one entity is required".into());
        }

        let mut kinds = HashSet::new();
        let mut tables: HashSet<&str> = RESERVED_TABLES.iter().copied().collect();
        tables.extend(reference::TABLES.iter().map(|(name, _)| *name));

        for entity in &self.entities {
            if !kinds.insert(entity.kind) {
                return invalid(format!("entity kind '{}' declared more than once", entity.kind));
            }
            if entity.sheet.trim().is_empty() {
                return invalid(format!("{}: sheet name is empty", entity.kind));
            }
            if entity.id == entity.name {
                return invalid(format!(
                    "{}: canonical id and name both read column '{}'",
                    entity.kind, entity.id
                ));
            }

            let table = entity.table();
            check_identifier(entity.kind, "table", table)?;
            if !tables.insert(table) {
                return invalid(format!("{}: table '{table}' is already used", entity.kind));
            }

            for source in &entity.sources {
                let at = format!("{} source '{}'", entity.kind, source.source);
                if source.source.trim().is_empty() {
                    return invalid(format!("{}: source label is empty", entity.kind));
                }
                check_identifier(entity.kind, "table", &source.table)?;
                check_identifier(entity.kind, "column", source.store_id())?;
                check_identifier(entity.kind, "column", source.store_name())?;

                if !tables.insert(&source.table) {
                    return invalid(format!("{at}: table '{}' is already used", source.table));
                }
                if source.id == source.name {
                    return invalid(format!("{at}: id and name both read column '{}'", source.id));
                }
                for col in [&source.id, &source.name] {
                    if *col == entity.id || *col == entity.name {
                        return invalid(format!("{at}: column '{col}' is a canonical column"));
                    }
                }
                let link = entity.kind.link_column();
                if source.store_id() == source.store_name()
                    || source.store_id() == link
                    || source.store_name() == link
                {
                    return invalid(format!(
                        "{at}: store columns '{}', '{}' and '{link}' must be distinct",
                        source.store_id(),
                        source.store_name()
                    ));
                }
            }
        }

        self.validate_references()?;
        self.reference.validate()
    }

    fn validate_references(&self) -> Result<(), ReconError> {
        for entity in &self.entities {
            for source in &entity.sources {
                let Some(ref target) = source.id_references else {
                    continue;
                };
                if *target == source.table {
                    return Err(ReconError::ConfigValidation(format!(
                        "table '{}' cannot reference itself",
                        source.table
                    )));
                }
                let parent = self
                    .entities
                    .iter()
                    .flat_map(|e| e.sources.iter())
                    .find(|s| s.table == *target)
                    .ok_or_else(|| {
                        ReconError::ConfigValidation(format!(
                            "table '{}': id_references '{target}' is not a declared source table",
                            source.table
                        ))
                    })?;
                if parent.name_in_key || parent.id_references.is_some() {
                    return Err(ReconError::ConfigValidation(format!(
                        "table '{}': referenced table '{target}' must be keyed by id alone and reference nothing itself",
                        source.table
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// The normalized schema this mapping loads into.
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.entities
                .iter()
                .map(|e| EntitySchema {
                    kind: e.kind,
                    table: e.table().to_string(),
                    sources: e.sources.iter().map(SourceConfig::to_table).collect(),
                })
                .collect(),
        )
    }

    /// Standard reference sets with this mapping's overrides applied.
    pub fn reference_data(&self) -> ReferenceData {
        let mut data = ReferenceData::standard();
        let o = &self.reference;
        if let Some(ref v) = o.fuels {
            data.fuels = v.clone();
        }
        if let Some(ref v) = o.fuel_units {
            data.fuel_units = v.clone();
        }
        if let Some(ref v) = o.prime_movers {
            data.prime_movers = v.clone();
        }
        if let Some(ref v) = o.rto_iso {
            data.rto_iso = v.clone();
        }
        if let Some(years) = o.years {
            data.years = (years.first..=years.last).collect();
        }
        data
    }
}

fn check_identifier(kind: EntityKind, what: &str, name: &str) -> Result<(), ReconError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!(
            "{kind}: {what} name '{name}' is not a valid SQL identifier"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
