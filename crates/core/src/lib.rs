//! `pudl-core`: the structural contract shared by every pipeline stage.
//!
//! Canonical entities, per-source records, the normalized schema (with its
//! foreign keys) and the static reference sets. No IO.

pub mod entity;
pub mod reference;
pub mod schema;

pub use entity::{CanonicalEntity, EntityKind, SourceRecord};
pub use reference::ReferenceData;
pub use schema::{EntitySchema, Schema, SourceKey, SourceTable};
