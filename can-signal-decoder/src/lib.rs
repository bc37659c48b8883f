//! CAN Signal Decoder Library
//!
//! A stateless, reusable library for decoding bit-packed CAN payloads into
//! named, typed and scaled field values, driven by a JSON signal table.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Splits byte buffers at arbitrary MSB-first bit offsets (`bits`)
//! - Holds one field layout per CAN ID, fixed or selected by a mode signal (`signals`)
//! - Decodes payloads into ordered field records (`MessageDecoder`)
//! - Parses candump log lines into frames (`formats`)
//!
//! The library does NOT:
//! - Select or format fields for display
//! - Handle command-line arguments
//! - Compute checksums or convert units beyond `raw * resolution + minimum`
//!
//! All higher-level functionality is in the application layer (can-signal-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_signal_decoder::{Decoder, DecoderConfig};
//! use std::path::Path;
//!
//! let config = DecoderConfig::new().with_skip_malformed_records(true);
//! let decoder = Decoder::from_schema_file(Path::new("signals.json"), config).unwrap();
//!
//! match decoder.decode_line("(1436509052.249713) vcan0 1A0#9C20407F96EA167B") {
//!     Ok(line) => {
//!         if let Some(message) = line.message {
//!             for field in &message.fields {
//!                 println!("{} = {} {}", field.name, field.value, field.unit);
//!             }
//!         }
//!     }
//!     Err(e) => eprintln!("Decode error: {}", e),
//! }
//! ```

// Public modules
pub mod bits;
pub mod config;
pub mod decoder;
pub mod formats;
pub mod message_decoder;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use bits::{extract_bits, hex_to_bytes, split_bits};
pub use config::DecoderConfig;
pub use decoder::{DecodedLine, Decoder};
pub use formats::CandumpParser;
pub use message_decoder::MessageDecoder;
pub use signals::{
    FieldDefinition, FieldType, RawSchemaRecord, SchemaLayout, SchemaTable, SignalSchema,
    TableStats,
};
pub use types::{
    CanFrame, DecodedField, DecodedMessage, DecoderError, FieldValue, Result, Timestamp,
};

/// Arbitrary-precision unsigned integer carrying raw field values
pub use num_bigint::BigUint;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
