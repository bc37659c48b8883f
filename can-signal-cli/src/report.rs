//! Line annotation
//!
//! Selects decoded fields by name and renders them as a remark appended to the
//! original log line.

use anyhow::Result;
use can_signal_decoder::{DecodedField, DecodedLine};
use serde::Serialize;
use std::collections::HashSet;

/// How decoded lines are rendered
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Show every decoded field
    pub all: bool,
    /// Show raw bits in hex instead of physical values
    pub bits: bool,
    /// 1+: append unit and description, 3+: dump the whole line as JSON
    pub verbosity: u8,
    /// Field names to show when `all` is not set
    pub fields: Vec<String>,
}

/// First field with the given name
pub fn find_field<'a>(name: &str, fields: &'a [DecodedField]) -> Option<&'a DecodedField> {
    fields.iter().find(|f| f.name == name)
}

/// Fields for the requested names, in request order, one per name
pub fn find_fields<'a, S: AsRef<str>>(names: &[S], fields: &'a [DecodedField]) -> Vec<&'a DecodedField> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| seen.insert(*name))
        .filter_map(|name| find_field(name, fields))
        .collect()
}

pub fn format_name_and_value(field: &DecodedField) -> String {
    format!("{}={}", field.name, field.value)
}

pub fn format_name_and_bits(field: &DecodedField) -> String {
    format!("{}=0x{:X}", field.name, field.bits)
}

/// JSON view of a decoded line
#[derive(Serialize)]
struct LineDump<'a> {
    text: &'a str,
    timestamp: Option<f64>,
    dt: Option<String>,
    interface: Option<&'a str>,
    id: Option<u32>,
    name: Option<&'a str>,
    fields: &'a [DecodedField],
}

/// Render one decoded line
pub fn render_line(line: &DecodedLine, options: &ReportOptions) -> Result<String> {
    let Some(message) = &line.message else {
        return Ok(line.text.clone());
    };

    if options.verbosity >= 3 {
        let frame = line.frame.as_ref();
        let dump = LineDump {
            text: &line.text,
            timestamp: frame.map(|f| f.timestamp_secs),
            dt: frame.map(|f| {
                f.timestamp()
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S%.6f")
                    .to_string()
            }),
            interface: frame.map(|f| f.interface.as_str()),
            id: frame.map(|f| f.can_id),
            name: Some(message.name.as_str()),
            fields: &message.fields,
        };
        return Ok(serde_json::to_string(&dump)?);
    }

    let selected = if options.all {
        let names: Vec<&str> = message.fields.iter().map(|f| f.name.as_str()).collect();
        find_fields(names.as_slice(), &message.fields)
    } else {
        find_fields(options.fields.as_slice(), &message.fields)
    };

    let formatter = if options.bits {
        format_name_and_bits
    } else {
        format_name_and_value
    };

    let remarks: Vec<String> = selected
        .into_iter()
        .map(|field| {
            let remark = formatter(field);
            if options.verbosity >= 1 {
                format!("{} ({} | {})", remark, field.unit, field.description)
            } else {
                remark
            }
        })
        .collect();

    if remarks.is_empty() {
        Ok(line.text.clone())
    } else {
        Ok(format!("{} : {}", line.text, remarks.join(", ")))
    }
}
