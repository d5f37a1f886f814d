use serde::{Deserialize, Serialize};

/// The kinds of canonical entity the store tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An electric utility operating in the US.
    Utility,
    /// A co-located collection of electricity generating infrastructure.
    Plant,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Utility, EntityKind::Plant];

    /// Default store table for the canonical entities of this kind.
    pub fn canonical_table(&self) -> &'static str {
        match self {
            Self::Utility => "utilities",
            Self::Plant => "plants",
        }
    }

    /// Column every source table of this kind uses to point at its canonical entity.
    pub fn link_column(&self) -> &'static str {
        match self {
            Self::Utility => "utility_id_pudl",
            Self::Plant => "plant_id_pudl",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utility => write!(f, "utility"),
            Self::Plant => write!(f, "plant"),
        }
    }
}

/// A canonical utility or plant. The id comes from the curated mapping and
/// round-trips into the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEntity {
    pub id: i64,
    pub name: String,
}

/// A utility or plant as one source system reports it, linked to exactly one
/// canonical entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub source_id: i64,
    pub name: String,
    pub canonical_id: i64,
}
