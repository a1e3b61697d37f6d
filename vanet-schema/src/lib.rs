//! # Vanet Table Schemas
//!
//! Crate for recognizing simulator output tables by their columns and
//! decoding them into the typed records of `vanet-core`.

pub mod error;
pub mod kind;
pub mod records;
pub mod table;

pub use error::SchemaError;
pub use kind::RecordKind;
pub use records::{decode, TypedTable};
pub use table::Table;
