//! Signal schemas and the schema table
//!
//! This module contains the in-memory message layouts and the builder that
//! turns signal table records into a queryable table.

pub mod schema;
pub mod table;

// Re-export key types for convenience
pub use schema::{FieldDefinition, FieldType, SchemaLayout, SignalSchema};
pub use table::{RawFieldEntry, RawFieldKind, RawSchemaRecord, SchemaTable, TableStats};
