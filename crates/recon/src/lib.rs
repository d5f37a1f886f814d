//! `pudl-recon`: identity reconciliation for the curated cross-reference.
//!
//! Pure engine crate: receives pre-loaded cross-reference tables, returns
//! validated canonical and per-source record sets. No IO.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod model;
pub mod project;

pub use config::MappingConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{Cell, CrossRefRow, CrossRefTable, ReconInput, ReconResult, Reconciled};
