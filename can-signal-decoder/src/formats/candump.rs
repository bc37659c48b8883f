//! candump log line parser
//!
//! Parses lines written by `candump -l` (and compatible loggers):
//!
//! ```text
//! (1436509052.249713) vcan0 044#2A366C2BBA        classic CAN
//! (1436509052.449847) can1 0F6##17ADFE07BD2       CAN-FD, one flag nibble
//! ```
//!
//! Anything after the payload is ignored. Lines in any other shape are not
//! frames and are reported as `None`.

use crate::bits::hex_to_bytes;
use crate::types::{CanFrame, DecoderError, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const PAT_CLASSIC: &str = r"^\((?P<timestamp>[0-9]+(?:\.[0-9]*)?)\) (?P<interface>[A-Za-z0-9]+) (?P<id>[A-Za-z0-9]+)#(?P<data>[A-Za-z0-9]*)(?:\s|$)";
const PAT_FD: &str = r"^\((?P<timestamp>[0-9]+(?:\.[0-9]*)?)\) (?P<interface>[A-Za-z0-9]+) (?P<id>[A-Za-z0-9]+)##[0-9A-Fa-f](?P<data>[A-Za-z0-9]*)(?:\s|$)";

fn classic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PAT_CLASSIC).expect("classic candump pattern is valid"))
}

fn fd_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PAT_FD).expect("FD candump pattern is valid"))
}

/// candump line parser
pub struct CandumpParser;

impl CandumpParser {
    /// Parse one log line
    ///
    /// # Returns
    /// * `Ok(Some(frame))` for a classic or FD frame line
    /// * `Ok(None)` if the line is not a frame line
    /// * `Err(MalformedHex)` if the identifier or payload is not hexadecimal
    pub fn parse_line(line: &str) -> Result<Option<CanFrame>> {
        if let Some(captures) = classic_pattern().captures(line) {
            return Self::build_frame(&captures, false);
        }
        if let Some(captures) = fd_pattern().captures(line) {
            return Self::build_frame(&captures, true);
        }

        log::trace!("Not a candump frame line: {:?}", line);
        Ok(None)
    }

    fn build_frame(captures: &Captures<'_>, is_fd: bool) -> Result<Option<CanFrame>> {
        let Ok(timestamp_secs) = captures["timestamp"].parse::<f64>() else {
            return Ok(None);
        };

        let id = &captures["id"];
        let can_id = u32::from_str_radix(id, 16)
            .map_err(|e| DecoderError::MalformedHex(format!("CAN ID {:?}: {}", id, e)))?;

        let data = hex_to_bytes(&captures["data"])?;

        Ok(Some(CanFrame {
            timestamp_secs,
            interface: captures["interface"].to_string(),
            can_id,
            data,
            is_fd,
        }))
    }
}
