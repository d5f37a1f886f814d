// File I/O: cross-reference input and the normalized store

pub mod crossref;
pub mod error;
pub mod store;

pub use error::{LoadError, StoreError};
pub use store::{read_snapshot, replace, LoadReport, ReplaceMode, StoreSnapshot};
