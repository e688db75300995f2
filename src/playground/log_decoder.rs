//! Log stream decoder
//!
//! Walks the packed records written by the device-side print helpers and
//! renders each completed message through the printf formatter.

use std::collections::BTreeMap;

use super::printf::{format_printf, PrintfArg};
use crate::utils::playground_constants::TRUNCATED_LOG_NOTICE;
use crate::utils::ShaderError;

/// Record tags (first word of every record).
pub mod tag {
    pub const FORMAT: u32 = 1;
    pub const STRING: u32 = 2;
    pub const INTEGER: u32 = 3;
    pub const FLOAT: u32 = 4;
    /// 64-bit values are not carried; they decode as zero.
    pub const WIDE: u32 = 5;
    pub const TERMINATOR: u32 = 0xFFFF_FFFF;
}

fn lookup(hash_table: &BTreeMap<u32, String>, hash: u32) -> String {
    match hash_table.get(&hash) {
        Some(s) => s.clone(),
        None => {
            log::warn!("[LogDecoder] Unknown string hash 0x{:08x}", hash);
            format!("<unknown string 0x{:08x}>", hash)
        }
    }
}

/// Decode a mapped log buffer into rendered lines.
///
/// `words` is the buffer viewed as `u32`s and `record_bytes` the size of one
/// record. Decoding stops at the first terminator not followed by a format
/// record. A message left open when the buffer runs out is still rendered,
/// followed by a truncation notice.
pub fn decode(
    hash_table: &BTreeMap<u32, String>,
    words: &[u32],
    record_bytes: usize,
) -> Result<Vec<String>, ShaderError> {
    let stride = (record_bytes / 4).max(2);
    let records: Vec<&[u32]> = words.chunks_exact(stride).collect();

    let mut lines = Vec::new();
    let mut format: Option<String> = None;
    let mut args: Vec<PrintfArg> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let low = record[1];
        match record[0] {
            tag::FORMAT => format = Some(lookup(hash_table, low)),
            tag::STRING => args.push(PrintfArg::Str(lookup(hash_table, low))),
            tag::INTEGER => args.push(PrintfArg::Int(low)),
            tag::FLOAT => args.push(PrintfArg::Float(f32::from_bits(low))),
            tag::WIDE => args.push(PrintfArg::Int(0)),
            tag::TERMINATOR => {
                let pending = format.take().unwrap_or_default();
                lines.push(format_printf(&pending, &args)?);
                args.clear();

                match records.get(index + 1) {
                    Some(next) if next[0] != tag::FORMAT => return Ok(lines),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if let Some(pending) = format.filter(|f| !f.is_empty()) {
        lines.push(format_printf(&pending, &args)?);
        lines.push(TRUNCATED_LOG_NOTICE.to_string());
    }

    Ok(lines)
}

/// Reinterpret mapped bytes as little-endian words.
pub fn words_from_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
