//! In-memory message layouts
//!
//! A `SignalSchema` describes how one message identifier is split into fields.
//! Layouts are either fixed (`Simple`) or selected at runtime by a
//! discriminator field read from the same payload (`Variant`).

use num_bigint::BigUint;
use std::collections::BTreeMap;

/// Decoding rule for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    /// Raw integer, no scaling
    Raw,
    /// Linear conversion: `raw * resolution + minimum`
    Float { resolution: f64, minimum: f64 },
}

/// A single field of a message layout
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Field name (not necessarily unique within a schema)
    pub name: String,
    /// Start bit (MSB-first, byte-major numbering)
    pub start: usize,
    /// Length in bits
    pub length: usize,
    /// Decoding rule
    pub field_type: FieldType,
    /// Engineering unit
    pub unit: String,
    /// Free text description
    pub description: String,
    /// True if this field is the discriminator of its message
    pub is_mode_signal: bool,
    /// Mode value under which this field is present
    pub mode_dependent_key: Option<u64>,
}

impl FieldDefinition {
    /// Apply the field's decoding rule to a raw integer
    pub fn physical_value(&self, raw: &BigUint) -> crate::types::FieldValue {
        use crate::types::{raw_to_f64, FieldValue};

        match self.field_type {
            FieldType::Raw => FieldValue::Raw(raw.clone()),
            FieldType::Float { resolution, minimum } => {
                FieldValue::Float(raw_to_f64(raw) * resolution + minimum)
            }
        }
    }
}

/// Field layout of a message
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLayout {
    /// Fields decoded unconditionally, in declaration order
    Simple(Vec<FieldDefinition>),
    /// Fields selected by the value of a discriminator
    Variant {
        /// Discriminator field
        mode: FieldDefinition,
        /// Discriminator raw value -> fields present in that mode
        variants: BTreeMap<u64, Vec<FieldDefinition>>,
    },
}

/// Layout of one message identifier. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSchema {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Field layout
    pub layout: SchemaLayout,
}

impl SignalSchema {
    /// True if the layout depends on a discriminator
    pub fn is_multi_mode(&self) -> bool {
        matches!(self.layout, SchemaLayout::Variant { .. })
    }

    /// Discriminator field, if this is a variant schema
    pub fn mode_field(&self) -> Option<&FieldDefinition> {
        match &self.layout {
            SchemaLayout::Simple(_) => None,
            SchemaLayout::Variant { mode, .. } => Some(mode),
        }
    }

    /// Number of field definitions across all layouts (discriminator included)
    pub fn field_count(&self) -> usize {
        match &self.layout {
            SchemaLayout::Simple(fields) => fields.len(),
            SchemaLayout::Variant { variants, .. } => {
                1 + variants.values().map(Vec::len).sum::<usize>()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn field(name: &str, start: usize, field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            start,
            length: 8,
            field_type,
            unit: String::new(),
            description: String::new(),
            is_mode_signal: false,
            mode_dependent_key: None,
        }
    }

    #[test]
    fn test_physical_value() {
        let raw = field("Counter", 0, FieldType::Raw);
        let twenty = BigUint::from(20u8);
        assert_eq!(raw.physical_value(&twenty), FieldValue::Raw(twenty.clone()));

        let scaled = field(
            "Temperature",
            0,
            FieldType::Float { resolution: 0.5, minimum: -10.0 },
        );
        assert_eq!(scaled.physical_value(&twenty), FieldValue::Float(0.0));
    }

    #[test]
    fn test_physical_value_of_wide_raw() {
        let wide = BigUint::from(1u8) << 100u32;
        let scaled = field("Energy", 0, FieldType::Float { resolution: 2.0, minimum: 1.0 });
        assert_eq!(scaled.physical_value(&wide), FieldValue::Float(2f64.powi(101) + 1.0));
    }

    #[test]
    fn test_layout_queries() {
        let simple = SignalSchema {
            id: 0x100,
            name: "Simple".to_string(),
            layout: SchemaLayout::Simple(vec![field("A", 0, FieldType::Raw)]),
        };
        assert!(!simple.is_multi_mode());
        assert!(simple.mode_field().is_none());
        assert_eq!(simple.field_count(), 1);

        let mut variants = BTreeMap::new();
        variants.insert(0, vec![field("A", 4, FieldType::Raw)]);
        variants.insert(1, vec![field("B", 4, FieldType::Raw), field("C", 8, FieldType::Raw)]);
        let variant = SignalSchema {
            id: 0x200,
            name: "Variant".to_string(),
            layout: SchemaLayout::Variant {
                mode: field("Mode", 0, FieldType::Raw),
                variants,
            },
        };
        assert!(variant.is_multi_mode());
        assert_eq!(variant.mode_field().map(|f| f.name.as_str()), Some("Mode"));
        assert_eq!(variant.field_count(), 4);
    }
}
