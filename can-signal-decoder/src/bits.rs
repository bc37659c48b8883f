//! Bit extraction over byte buffers
//!
//! Bit positions count from 0 at the most significant bit of the first byte and
//! increase byte-major: byte `i` holds positions `8i..8i+8`, with `8i` its MSB.
//! Extracted ranges are read MSB-first, so the result is the unsigned value of
//! the bit range regardless of byte alignment.
//!
//! Raw values are `BigUint`, so a range keeps every bit however wide it is
//! (a CAN-FD payload is up to 512 bits).

use crate::types::{DecoderError, Result};
use num_bigint::BigUint;

/// Split `buffer` into one unsigned integer per offset
///
/// Chunk `i` covers `offsets[i]..offsets[i + 1]`; the final chunk runs from
/// the last offset to `end`, which defaults to the end of the buffer.
/// Equal consecutive offsets (or a final offset equal to `end`) yield `0`.
///
/// # Errors
/// * `OutOfRange` if `end` lies past the buffer or an offset lies past `end`
/// * `UnorderedOffsets` if the offsets are not ascending
///
/// # Example
/// ```
/// use can_signal_decoder::bits::split_bits;
/// use num_bigint::BigUint;
///
/// let chunks = split_bits(&[0xAB, 0xCD], &[0, 4, 12], None).unwrap();
/// let expected: Vec<BigUint> = vec![0xAu8.into(), 0xBCu8.into(), 0xDu8.into()];
/// assert_eq!(chunks, expected);
/// ```
pub fn split_bits(buffer: &[u8], offsets: &[usize], end: Option<usize>) -> Result<Vec<BigUint>> {
    let limit = buffer.len() << 3;
    let end = end.unwrap_or(limit);

    if end > limit {
        return Err(DecoderError::OutOfRange {
            start: offsets.first().copied().unwrap_or(end),
            stop: end,
            limit,
        });
    }

    for (index, pair) in offsets.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(DecoderError::UnorderedOffsets {
                index: index + 1,
                previous: pair[0],
                next: pair[1],
            });
        }
    }

    if let Some(&last) = offsets.last() {
        if last > end {
            return Err(DecoderError::OutOfRange {
                start: last,
                stop: last,
                limit: end,
            });
        }
    }

    offsets
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let stop = offsets.get(i + 1).copied().unwrap_or(end);
            read_chunk(buffer, start, stop)
        })
        .collect()
}

/// Extract `length` bits starting at bit `start`
///
/// Equivalent to `split_bits(buffer, &[start], Some(start + length))[0]`.
///
/// # Example
/// ```
/// use can_signal_decoder::bits::extract_bits;
/// use num_bigint::BigUint;
///
/// // 10101011 11001101 -> bits 4..12 are 1011_1100
/// assert_eq!(extract_bits(&[0xAB, 0xCD], 4, 8).unwrap(), BigUint::from(0xBCu8));
/// ```
pub fn extract_bits(buffer: &[u8], start: usize, length: usize) -> Result<BigUint> {
    let limit = buffer.len() << 3;
    let stop = start.checked_add(length).ok_or(DecoderError::OutOfRange {
        start,
        stop: usize::MAX,
        limit,
    })?;

    if stop > limit {
        return Err(DecoderError::OutOfRange { start, stop, limit });
    }

    read_chunk(buffer, start, stop)
}

/// Decode a hexadecimal string into bytes
///
/// Odd-length input is left-padded with a single `'0'` ("F" == "0F"),
/// since upstream logs occasionally drop a leading zero.
pub fn hex_to_bytes(hex_string: &str) -> Result<Vec<u8>> {
    let decoded = if hex_string.len() % 2 != 0 {
        hex::decode(format!("0{}", hex_string))
    } else {
        hex::decode(hex_string)
    };

    decoded.map_err(|e| DecoderError::MalformedHex(format!("{:?}: {}", hex_string, e)))
}

/// Read bits `start..stop` MSB-first
///
/// Walks the buffer byte by byte: bits before `start` are masked off, bits past
/// the lesser of the byte end and `stop` are shifted out, and the survivors are
/// appended to the accumulator.
fn read_chunk(buffer: &[u8], start: usize, stop: usize) -> Result<BigUint> {
    let mut bits = BigUint::default();
    let mut pos = start;
    let mut index = pos >> 3;

    while pos < stop {
        let byte = *buffer.get(index).ok_or(DecoderError::OutOfRange {
            start,
            stop,
            limit: buffer.len() << 3,
        })?;

        let byte_end = (index + 1) << 3;
        let to_pos = stop.min(byte_end);
        let width = to_pos - pos;

        let survivors = (byte & (0xFF >> (pos % 8))) >> (byte_end - to_pos);
        bits = (bits << width) | BigUint::from(survivors);

        pos = to_pos;
        if pos >= byte_end {
            index += 1;
        }
    }

    Ok(bits)
}
