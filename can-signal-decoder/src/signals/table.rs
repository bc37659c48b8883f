//! Schema table construction
//!
//! Builds the identifier -> `SignalSchema` map from raw schema records, as
//! found in the JSON signal table files. The table is built once and is
//! read-only afterwards.

use crate::config::DecoderConfig;
use crate::signals::schema::{FieldDefinition, FieldType, SchemaLayout, SignalSchema};
use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A message record as written in the signal table file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSchemaRecord {
    /// Hexadecimal CAN ID (optional "0x" prefix)
    pub id: String,
    /// Message name
    pub name: String,
    /// Field entries in declaration order
    pub values: Vec<RawFieldEntry>,
}

/// A field entry as written in the signal table file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFieldEntry {
    pub name: String,
    pub start: usize,
    pub length: usize,
    #[serde(rename = "type")]
    pub kind: RawFieldKind,
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub desc: String,
    /// 1 marks the discriminator
    pub mode_signal: u8,
    /// Hexadecimal mode key, or "" for fields present in every mode
    pub mode_dependent: String,
}

/// Field type tag in the signal table file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFieldKind {
    Raw,
    Float,
}

/// Identifier -> schema map
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    schemas: HashMap<u32, SignalSchema>,
}

impl SchemaTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records in source order
    ///
    /// The first record of each identifier wins; later duplicates are dropped.
    /// Malformed records abort the build unless
    /// `config.skip_malformed_records` is set, in which case they are skipped.
    pub fn build<I>(records: I, config: &DecoderConfig) -> Result<Self>
    where
        I: IntoIterator<Item = RawSchemaRecord>,
    {
        let mut table = Self::new();

        for record in records {
            let outcome = table.add_record(&record);
            apply_policy(outcome, config)?;
        }

        Ok(table)
    }

    /// Build a table from a JSON array of records
    pub fn from_json_str(json: &str, config: &DecoderConfig) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Self::from_values(values, config)
    }

    /// Build a table from a reader yielding a JSON array of records
    pub fn from_reader<R: Read>(reader: R, config: &DecoderConfig) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_reader(reader)?;
        Self::from_values(values, config)
    }

    /// Load a JSON signal table file
    pub fn load_file(path: &Path, config: &DecoderConfig) -> Result<Self> {
        log::info!("Loading signal table: {:?}", path);

        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file), config)?;

        log::info!("Loaded {} schemas from {:?}", table.len(), path);
        Ok(table)
    }

    fn from_values(values: Vec<Value>, config: &DecoderConfig) -> Result<Self> {
        let mut table = Self::new();

        for value in values {
            // The id is checked before the rest of the record so that a
            // duplicate is dropped even when its field entries are incomplete.
            let outcome = record_id(&value).and_then(|id| {
                if table.schemas.contains_key(&id) {
                    log::debug!("Skipping duplicate record for CAN ID 0x{:X}", id);
                    return Ok(false);
                }
                let record: RawSchemaRecord = serde_json::from_value(value).map_err(|e| {
                    DecoderError::MalformedSchema(format!("record 0x{:X}: {}", id, e))
                })?;
                table.add_record(&record)
            });
            apply_policy(outcome, config)?;
        }

        Ok(table)
    }

    /// Add one record
    ///
    /// Returns `Ok(false)` if a schema with the same identifier is already
    /// present (the record is dropped).
    pub fn add_record(&mut self, record: &RawSchemaRecord) -> Result<bool> {
        let id = parse_hex_id(&record.id)?;

        if self.schemas.contains_key(&id) {
            log::debug!("Skipping duplicate record for CAN ID 0x{:X}", id);
            return Ok(false);
        }

        let schema = build_schema(id, record)?;
        self.schemas.insert(id, schema);
        Ok(true)
    }

    /// Get the schema for a CAN ID
    pub fn get(&self, can_id: u32) -> Option<&SignalSchema> {
        self.schemas.get(&can_id)
    }

    /// Check if a schema exists for a CAN ID
    pub fn contains(&self, can_id: u32) -> bool {
        self.schemas.contains_key(&can_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Get all CAN IDs in the table, sorted
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.schemas.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get table statistics
    pub fn stats(&self) -> TableStats {
        TableStats {
            num_schemas: self.schemas.len(),
            num_variant_schemas: self.schemas.values().filter(|s| s.is_multi_mode()).count(),
            num_fields: self.schemas.values().map(SignalSchema::field_count).sum(),
        }
    }
}

/// Schema table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of message identifiers
    pub num_schemas: usize,
    /// Number of schemas with a discriminator
    pub num_variant_schemas: usize,
    /// Total number of field definitions
    pub num_fields: usize,
}

fn apply_policy(outcome: Result<bool>, config: &DecoderConfig) -> Result<()> {
    match outcome {
        Ok(_) => Ok(()),
        Err(DecoderError::MalformedSchema(reason)) if config.skip_malformed_records => {
            log::warn!("Skipping malformed schema record: {}", reason);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn record_id(value: &Value) -> Result<u32> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DecoderError::MalformedSchema("record without a string \"id\"".to_string()))?;
    parse_hex_id(id)
}

fn strip_hex_prefix(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

fn parse_hex_id(text: &str) -> Result<u32> {
    u32::from_str_radix(strip_hex_prefix(text), 16)
        .map_err(|e| DecoderError::MalformedSchema(format!("invalid CAN ID {:?}: {}", text, e)))
}

fn parse_mode_key(text: &str) -> Result<u64> {
    u64::from_str_radix(strip_hex_prefix(text), 16)
        .map_err(|e| DecoderError::MalformedSchema(format!("invalid mode key {:?}: {}", text, e)))
}

/// Convert a raw record into a schema
fn build_schema(id: u32, record: &RawSchemaRecord) -> Result<SignalSchema> {
    let mut mode: Option<FieldDefinition> = None;
    let mut variants: BTreeMap<u64, Vec<FieldDefinition>> = BTreeMap::new();
    let mut fields = Vec::with_capacity(record.values.len());

    for entry in &record.values {
        let field = convert_field(id, entry)?;

        // Discriminator and mode membership are independent flags
        if field.is_mode_signal {
            if let Some(previous) = &mode {
                log::warn!(
                    "CAN ID 0x{:X}: mode signal '{}' replaces '{}'",
                    id,
                    field.name,
                    previous.name
                );
            }
            mode = Some(field.clone());
        }

        if let Some(key) = field.mode_dependent_key {
            variants.entry(key).or_default().push(field.clone());
        }

        fields.push(field);
    }

    let layout = match mode {
        Some(mode) => {
            for (key, sequence) in &variants {
                check_ascending(id, sequence)
                    .map_err(|e| DecoderError::MalformedSchema(format!("{} (mode {})", e, key)))?;
            }
            SchemaLayout::Variant { mode, variants }
        }
        None => {
            check_ascending(id, &fields).map_err(DecoderError::MalformedSchema)?;
            SchemaLayout::Simple(fields)
        }
    };

    Ok(SignalSchema {
        id,
        name: record.name.clone(),
        layout,
    })
}

fn convert_field(id: u32, entry: &RawFieldEntry) -> Result<FieldDefinition> {
    let field_type = match entry.kind {
        RawFieldKind::Raw => FieldType::Raw,
        RawFieldKind::Float => match (entry.resolution, entry.minimum) {
            (Some(resolution), Some(minimum)) => FieldType::Float { resolution, minimum },
            _ => {
                return Err(DecoderError::MalformedSchema(format!(
                    "CAN ID 0x{:X}: float field '{}' needs both resolution and minimum",
                    id, entry.name
                )))
            }
        },
    };

    let mode_dependent_key = if entry.mode_dependent.trim().is_empty() {
        None
    } else {
        Some(parse_mode_key(&entry.mode_dependent)?)
    };

    Ok(FieldDefinition {
        name: entry.name.clone(),
        start: entry.start,
        length: entry.length,
        field_type,
        unit: entry.unit.clone(),
        description: entry.desc.clone(),
        is_mode_signal: entry.mode_signal == 1,
        mode_dependent_key,
    })
}

/// Field starts must be non-decreasing for the one-pass split
fn check_ascending(id: u32, fields: &[FieldDefinition]) -> std::result::Result<(), String> {
    match fields.windows(2).find(|pair| pair[1].start < pair[0].start) {
        Some(pair) => Err(format!(
            "CAN ID 0x{:X}: field '{}' at bit {} follows '{}' at bit {}",
            id, pair[1].name, pair[1].start, pair[0].name, pair[0].start
        )),
        None => Ok(()),
    }
}
