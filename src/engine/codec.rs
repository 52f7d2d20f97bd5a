//! Order-preserving binary encoding of keys.
//!
//! Encoded keys compare bytewise in the same order as [`Key`] compares, so a
//! sorted keyspace iterates records in key order. Encodings are prefix-free:
//! no encoded key is a proper prefix of another, which lets an index entry be
//! stored as `encode(index_key) ++ encode(primary_key)` and scanned by the
//! index key prefix.
//!
//! Layout:
//!
//! - number: `0x10` + 8 bytes big-endian of the sign-flipped IEEE-754 bits
//! - string: `0x20` + UTF-8 bytes with `0x00` escaped as `0x00 0xFF`,
//!   terminated by `0x00 0x00`
//! - array: `0x40` + encoded elements, terminated by `0x00`

use crate::value::Key;

const TAG_NUMBER: u8 = 0x10;
const TAG_STRING: u8 = 0x20;
const TAG_ARRAY: u8 = 0x40;
const TERMINATOR: u8 = 0x00;
const ESCAPE: u8 = 0xFF;

/// Encode a key.
pub fn encode(key: &Key) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    encode_into(key, &mut out);
    out
}

/// Append the encoding of `key` to `out`.
pub fn encode_into(key: &Key, out: &mut Vec<u8>) {
    match key {
        Key::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&sortable_bits(*n).to_be_bytes());
        }
        Key::String(s) => {
            out.push(TAG_STRING);
            for &byte in s.as_bytes() {
                out.push(byte);
                if byte == TERMINATOR {
                    out.push(ESCAPE);
                }
            }
            out.push(TERMINATOR);
            out.push(TERMINATOR);
        }
        Key::Array(items) => {
            out.push(TAG_ARRAY);
            for item in items {
                encode_into(item, out);
            }
            out.push(TERMINATOR);
        }
    }
}

/// Encode an index entry key: index key followed by primary key.
pub fn encode_index_entry(index_key: &Key, primary_key: &[u8]) -> Vec<u8> {
    let mut out = encode(index_key);
    out.extend_from_slice(primary_key);
    out
}

fn sortable_bits(n: f64) -> u64 {
    let n = if n == 0.0 { 0.0 } else { n };
    let bits = n.to_bits();
    if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) }
}
