//! Message Decoding Engine
//!
//! Turns a payload into decoded fields based on the message's schema.
//! Handles variant resolution, the one-pass bit split and physical value
//! conversion.

use crate::bits;
use crate::signals::schema::{FieldDefinition, SchemaLayout, SignalSchema};
use crate::types::{DecodedField, DecodedMessage, DecoderError, FieldValue, Result};
use num_traits::ToPrimitive;

/// Message decoder - extracts fields from payloads
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode a payload into a DecodedMessage
    ///
    /// # Arguments
    /// * `schema` - Layout of the message
    /// * `payload` - Raw payload bytes
    ///
    /// # Returns
    /// * `Ok(DecodedMessage)` with the discriminator (if any) followed by the
    ///   active fields, in declaration order
    /// * `Err(UnknownMode)` if the discriminator value has no layout
    /// * `Err(OutOfRange)` if the discriminator lies past the payload
    pub fn decode_message(schema: &SignalSchema, payload: &[u8]) -> Result<DecodedMessage> {
        let mut fields = Vec::new();

        let (mode, active) = match &schema.layout {
            SchemaLayout::Simple(values) => (None, values.as_slice()),
            SchemaLayout::Variant { mode, variants } => {
                let mode_value = bits::extract_bits(payload, mode.start, mode.length)?;

                // Mode keys are u64; a wider discriminator value matches none
                let Some((key, active)) = mode_value
                    .to_u64()
                    .and_then(|key| variants.get(&key).map(|active| (key, active)))
                else {
                    return Err(DecoderError::UnknownMode {
                        can_id: schema.id,
                        mode: mode_value,
                    });
                };

                // The discriminator is reported unscaled whatever its type
                fields.push(DecodedField {
                    name: mode.name.clone(),
                    bits: mode_value.clone(),
                    value: FieldValue::Raw(mode_value),
                    unit: mode.unit.clone(),
                    description: mode.description.clone(),
                });

                (Some(key), active.as_slice())
            }
        };

        fields.extend(Self::decode_fields(schema.id, active, payload)?);

        Ok(DecodedMessage {
            can_id: schema.id,
            name: schema.name.clone(),
            mode,
            fields,
        })
    }

    /// Decode a payload into the ordered list of fields only
    pub fn decode(schema: &SignalSchema, payload: &[u8]) -> Result<Vec<DecodedField>> {
        Self::decode_message(schema, payload).map(|message| message.fields)
    }

    /// Split the payload at every field start and pair chunks with definitions
    ///
    /// Each chunk runs up to the next field's start; the last one runs to the
    /// end of the payload. Fields starting at or past the end of a short
    /// payload are left out, so one schema serves every payload length.
    fn decode_fields(
        can_id: u32,
        definitions: &[FieldDefinition],
        payload: &[u8],
    ) -> Result<Vec<DecodedField>> {
        let available = payload.len() << 3;
        let starts: Vec<usize> = definitions
            .iter()
            .map(|d| d.start)
            .take_while(|&start| start < available)
            .collect();

        if starts.len() < definitions.len() {
            log::debug!(
                "CAN ID 0x{:X}: payload of {} bytes covers {} of {} fields",
                can_id,
                payload.len(),
                starts.len(),
                definitions.len()
            );
        }

        if starts.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = bits::split_bits(payload, &starts, None)?;

        Ok(definitions
            .iter()
            .zip(chunks)
            .map(|(definition, raw)| DecodedField {
                name: definition.name.clone(),
                value: definition.physical_value(&raw),
                bits: raw,
                unit: definition.unit.clone(),
                description: definition.description.clone(),
            })
            .collect())
    }
}
