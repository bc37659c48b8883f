//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct owns the schema table and decodes payloads and log lines
//! against it. It holds no mutable state and can be shared across threads.

use crate::config::DecoderConfig;
use crate::formats::CandumpParser;
use crate::message_decoder::MessageDecoder;
use crate::signals::{SchemaTable, TableStats};
use crate::types::{CanFrame, DecodedMessage, Result};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
pub struct Decoder {
    /// Schema table (loaded once, read-only afterwards)
    table: SchemaTable,
    config: DecoderConfig,
}

/// Outcome of decoding one log line
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    /// The original line text
    pub text: String,
    /// Parsed frame, if the line is a frame line
    pub frame: Option<CanFrame>,
    /// Decoded message, if the frame's CAN ID has a schema
    pub message: Option<DecodedMessage>,
}

impl Decoder {
    /// Create a decoder over an already built schema table
    pub fn new(table: SchemaTable, config: DecoderConfig) -> Self {
        Self { table, config }
    }

    /// Load a JSON signal table file and create a decoder over it
    ///
    /// # Example
    /// ```no_run
    /// use can_signal_decoder::{Decoder, DecoderConfig};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::from_schema_file(Path::new("signals.json"), DecoderConfig::new()).unwrap();
    /// println!("{} schemas", decoder.stats().num_schemas);
    /// ```
    pub fn from_schema_file(path: &Path, config: DecoderConfig) -> Result<Self> {
        let table = SchemaTable::load_file(path, &config)?;
        Ok(Self::new(table, config))
    }

    /// Decode a payload for a CAN ID
    ///
    /// # Returns
    /// * `Ok(None)` if the CAN ID has no schema or is filtered out
    /// * `Ok(Some(message))` if decoding succeeded
    /// * `Err(_)` if the payload does not fit the schema (`OutOfRange`, `UnknownMode`)
    pub fn decode_payload(&self, can_id: u32, payload: &[u8]) -> Result<Option<DecodedMessage>> {
        if !self.config.should_process_message(can_id) {
            log::trace!("CAN ID 0x{:X} filtered out", can_id);
            return Ok(None);
        }

        let Some(schema) = self.table.get(can_id) else {
            log::trace!("Unknown CAN ID: 0x{:X}", can_id);
            return Ok(None);
        };

        log::debug!("Decoding message: {} (ID 0x{:X})", schema.name, can_id);
        MessageDecoder::decode_message(schema, payload).map(Some)
    }

    /// Decode one candump log line
    ///
    /// # Example
    /// ```
    /// use can_signal_decoder::{BigUint, Decoder, DecoderConfig, SchemaTable};
    ///
    /// let json = r#"[{"id": "1A0", "name": "Status", "values": [
    ///     {"name": "Counter", "start": 0, "length": 8, "type": "raw",
    ///      "unit": "", "desc": "", "mode_signal": 0, "mode_dependent": ""}]}]"#;
    /// let config = DecoderConfig::new();
    /// let table = SchemaTable::from_json_str(json, &config).unwrap();
    /// let decoder = Decoder::new(table, config);
    ///
    /// let line = decoder.decode_line("(1436509052.249713) vcan0 1A0#2A").unwrap();
    /// assert_eq!(line.message.unwrap().fields[0].bits, BigUint::from(0x2Au8));
    /// ```
    pub fn decode_line(&self, line: &str) -> Result<DecodedLine> {
        let frame = CandumpParser::parse_line(line)?;

        let message = match &frame {
            Some(frame) => self.decode_payload(frame.can_id, &frame.data)?,
            None => None,
        };

        Ok(DecodedLine {
            text: line.to_string(),
            frame,
            message,
        })
    }

    /// Access the schema table
    pub fn table(&self) -> &SchemaTable {
        &self.table
    }

    /// Get statistics about the loaded schema table
    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecoderError, FieldValue};
    use num_bigint::BigUint;

    const TABLE: &str = r#"[
        {"id": "1A0", "name": "Status", "values": [
            {"name": "Counter", "start": 0, "length": 8, "type": "raw",
             "unit": "", "desc": "", "mode_signal": 0, "mode_dependent": ""},
            {"name": "Voltage", "start": 8, "length": 8, "type": "float",
             "resolution": 0.1, "minimum": 0, "unit": "V", "desc": "", "mode_signal": 0, "mode_dependent": ""}
        ]},
        {"id": "2B0", "name": "Drive", "values": [
            {"name": "Mode", "start": 0, "length": 4, "type": "raw",
             "unit": "", "desc": "", "mode_signal": 1, "mode_dependent": ""},
            {"name": "Speed", "start": 4, "length": 12, "type": "raw",
             "unit": "km/h", "desc": "", "mode_signal": 0, "mode_dependent": "0"}
        ]}
    ]"#;

    fn decoder(config: DecoderConfig) -> Decoder {
        let table = SchemaTable::from_json_str(TABLE, &config).unwrap();
        Decoder::new(table, config)
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::new(SchemaTable::new(), DecoderConfig::new());
        let stats = decoder.stats();
        assert_eq!(stats.num_schemas, 0);
        assert_eq!(stats.num_fields, 0);
    }

    #[test]
    fn test_decode_line() {
        let decoder = decoder(DecoderConfig::new());
        let line = decoder.decode_line("(1436509052.249713) vcan0 1A0#2A64").unwrap();

        let frame = line.frame.unwrap();
        assert_eq!(frame.can_id, 0x1A0);

        let message = line.message.unwrap();
        assert_eq!(message.name, "Status");
        assert_eq!(message.field("Counter").unwrap().bits, BigUint::from(0x2Au8));
        match &message.field("Voltage").unwrap().value {
            FieldValue::Float(v) => assert!((v - 10.0).abs() < 1e-9),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_id_and_plain_text() {
        let decoder = decoder(DecoderConfig::new());

        let line = decoder.decode_line("(1.0) vcan0 7FF#00").unwrap();
        assert!(line.frame.is_some());
        assert!(line.message.is_none());

        let line = decoder.decode_line("not a frame").unwrap();
        assert!(line.frame.is_none());
        assert_eq!(line.text, "not a frame");
    }

    #[test]
    fn test_message_filter() {
        let decoder = decoder(DecoderConfig::new().with_message_filter(vec![0x2B0]));
        assert!(decoder.decode_payload(0x1A0, &[0x01, 0x02]).unwrap().is_none());
        assert!(decoder.decode_payload(0x2B0, &[0x01, 0x02]).unwrap().is_some());
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let decoder = decoder(DecoderConfig::new());
        let result = decoder.decode_line("(1.0) vcan0 2B0#5000");
        match result {
            Err(DecoderError::UnknownMode { can_id, mode }) => {
                assert_eq!(can_id, 0x2B0);
                assert_eq!(mode, BigUint::from(5u8));
            }
            other => panic!("expected UnknownMode, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Decoder>();
    }
}
