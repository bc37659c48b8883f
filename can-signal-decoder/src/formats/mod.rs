//! Log line formats
//!
//! This module contains parsers for textual CAN log formats. Each parser turns
//! one line into an optional CanFrame.

pub mod candump;

// Re-export parser types
pub use candump::CandumpParser;
