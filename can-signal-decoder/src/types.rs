//! Core types for the CAN signal decoder library
//!
//! This module defines the frames the decoder consumes, the records it emits
//! and the error type shared by every operation. Decoded records are created
//! fresh per message and carry no identity beyond their position in the result.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Raw CAN frame taken from a log line
///
/// This represents a single CAN frame as read from the log,
/// before any field decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame {
    /// Timestamp in seconds since epoch, as written in the log
    pub timestamp_secs: f64,
    /// CAN interface name (e.g., "can0", "vcan1")
    pub interface: String,
    /// CAN message ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
    /// True if this is a CAN-FD frame
    pub is_fd: bool,
}

impl CanFrame {
    /// Convert the log timestamp to DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = self.timestamp_secs.trunc() as i64;
        let nsecs = (self.timestamp_secs.fract() * 1_000_000_000.0).round() as u32;
        DateTime::from_timestamp(secs, nsecs.min(999_999_999)).unwrap_or_default()
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Errors that can occur during schema loading and decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Bit range {start}..{stop} exceeds the {limit} available bits")]
    OutOfRange { start: usize, stop: usize, limit: usize },

    #[error("Bit offset {next} at index {index} precedes offset {previous}")]
    UnorderedOffsets { index: usize, previous: usize, next: usize },

    #[error("Unknown mode {mode} for CAN ID 0x{can_id:X}")]
    UnknownMode { can_id: u32, mode: BigUint },

    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    #[error("Malformed hex: {0}")]
    MalformedHex(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A decoded field with its value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    /// Field name from the schema
    pub name: String,
    /// Raw unsigned integer extracted from the payload, at full width
    #[serde(serialize_with = "serialize_raw")]
    pub bits: BigUint,
    /// Physical value (scaled for float fields, raw otherwise)
    pub value: FieldValue,
    /// Engineering unit (e.g., "km/h", "V")
    pub unit: String,
    /// Free text description from the schema
    pub description: String,
}

/// Field value types emitted by the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unscaled raw integer
    Raw(BigUint),
    /// Floating-point value (after scaling/offset)
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Raw(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write_float(f, *v),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Raw(v) => serialize_raw(v, serializer),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
        }
    }
}

impl FieldValue {
    /// Convert field value to f64
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Raw(v) => raw_to_f64(v),
            FieldValue::Float(v) => *v,
        }
    }
}

/// Nearest `f64` to a raw integer
pub fn raw_to_f64(raw: &BigUint) -> f64 {
    raw.to_f64().unwrap_or(f64::INFINITY)
}

/// Raw integers up to 64 bits serialize as JSON numbers, wider ones as decimal strings
fn serialize_raw<S: Serializer>(raw: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match raw.to_u64() {
        Some(v) => serializer.serialize_u64(v),
        None => serializer.serialize_str(&raw.to_str_radix(10)),
    }
}

/// Shortest round-trip digits; "0.0" and "12.5" in positional form, and
/// exponent form below 1e-4 or from 1e16 up, written "1e-07" / "1.5e+16"
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }

    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{:e}", v);
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return write!(f, "{}e{}{:0>2}", mantissa, sign, digits);
        }
    }

    write!(f, "{:?}", v)
}

/// One decoded message: the discriminator (if any) followed by the active fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// CAN message ID
    pub can_id: u32,
    /// Message name from the schema table
    pub name: String,
    /// Active mode, present only for variant schemas
    pub mode: Option<u64>,
    /// Decoded fields in schema-declaration order
    pub fields: Vec<DecodedField>,
}

impl DecodedMessage {
    /// First field with the given name
    pub fn field(&self, name: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_display() {
        assert_eq!(format!("{}", FieldValue::Raw(BigUint::from(42u8))), "42");
        assert_eq!(format!("{}", FieldValue::Float(0.0)), "0.0");
        assert_eq!(format!("{}", FieldValue::Float(12.5)), "12.5");
        assert_eq!(format!("{}", FieldValue::Float(-3.0)), "-3.0");
        assert_eq!(FieldValue::Raw(BigUint::from(7u8)).as_f64(), 7.0);
    }

    #[test]
    fn test_float_display_exponent_form() {
        let show = |v: f64| FieldValue::Float(v).to_string();

        assert_eq!(show(1e16), "1e+16");
        assert_eq!(show(1.5e16), "1.5e+16");
        assert_eq!(show(-2.5e20), "-2.5e+20");
        assert_eq!(show(1e100), "1e+100");
        assert_eq!(show(1e-7), "1e-07");
        assert_eq!(show(1.25e-5), "1.25e-05");
        assert_eq!(show(1e-300), "1e-300");

        // Positional up to the thresholds
        assert_eq!(show(1e15), "1000000000000000.0");
        assert_eq!(show(9999999999999998.0), "9999999999999998.0");
        assert_eq!(show(0.0001), "0.0001");
        assert_eq!(show(0.1 + 0.2), "0.30000000000000004");

        assert_eq!(show(f64::NAN), "nan");
        assert_eq!(show(f64::INFINITY), "inf");
        assert_eq!(show(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_wide_raw_value() {
        let wide = BigUint::from(0xAB_CD00_0000_0000_0000_u128);
        let value = FieldValue::Raw(wide.clone());

        assert_eq!(value.to_string(), "3169165043382108553216");
        assert_eq!(value.as_f64(), 0xAB_CD00_0000_0000_0000_u128 as f64);
        assert_eq!(serde_json::to_value(&value).unwrap(), "3169165043382108553216");
        assert_eq!(
            serde_json::to_value(FieldValue::Raw(BigUint::from(42u8))).unwrap(),
            42
        );
    }

    #[test]
    fn test_frame_timestamp() {
        let frame = CanFrame {
            timestamp_secs: 1436509052.5,
            interface: "vcan0".to_string(),
            can_id: 0x44,
            data: vec![0x2A, 0x36],
            is_fd: false,
        };
        let ts = frame.timestamp();
        assert_eq!(ts.timestamp(), 1436509052);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert_eq!(frame.dlc(), 2);
    }

    #[test]
    fn test_error_messages() {
        let err = DecoderError::UnknownMode { can_id: 0x1A0, mode: BigUint::from(3u8) };
        assert_eq!(err.to_string(), "Unknown mode 3 for CAN ID 0x1A0");

        let err = DecoderError::OutOfRange { start: 4, stop: 24, limit: 16 };
        assert_eq!(err.to_string(), "Bit range 4..24 exceeds the 16 available bits");
    }
}
