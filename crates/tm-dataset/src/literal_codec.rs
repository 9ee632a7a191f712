//! Literal and discriminator key encoding.
//!
//! Every literal starts with a tag byte:
//!
//! | tag    | payload                                          |
//! |--------|--------------------------------------------------|
//! | `0x00` | `false`                                          |
//! | `0x01` | `true`                                           |
//! | `0x02` | i32 as big-endian `u32` of `v + 2^31`            |
//! | `0x03` | UTF-8 bytes, `0x00`-terminated                   |
//! | `0x04` | absent (path did not resolve)                    |
//! | `0x05` | `null`                                           |
//! | `0x06` | elements, then `0x00`                            |
//! | `0x07` | `key\0 literal` pairs in key order, then `0x00`  |
//! | `0x08` | i64 big-endian, outside the i32 range            |
//! | `0x09` | u64 big-endian, above `i64::MAX`                 |
//! | `0x0A` | f64 bits big-endian, non-integer numbers         |
//! | `0x0B` | `false` as an array element                      |
//!
//! Inside an array `0x00` is the terminator, so `false` elements use `0x0B`.
//! A discriminator key is always written as an object.

use std::collections::BTreeMap;

use serde_json::Number;
use tm_common::{DiscriminatorKey, Literal};

use crate::bytes::{write_cstr, ByteReader};
use crate::error::{DatasetError, Result};

/// Deepest literal nesting accepted when decoding.
pub const MAX_LITERAL_DEPTH: usize = 256;

mod tag {
    pub const FALSE: u8 = 0x00;
    pub const TRUE: u8 = 0x01;
    pub const INT32: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const ABSENT: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const ARRAY: u8 = 0x06;
    pub const OBJECT: u8 = 0x07;
    pub const INT64: u8 = 0x08;
    pub const UINT64: u8 = 0x09;
    pub const FLOAT64: u8 = 0x0A;
    pub const ELEMENT_FALSE: u8 = 0x0B;
}

const END: u8 = 0x00;
const INT32_BIAS: i64 = 1 << 31;

/// Append the encoding of `literal` to `out`.
pub fn encode_literal(literal: &Literal, out: &mut Vec<u8>) -> Result<()> {
    match literal {
        Literal::Absent => out.push(tag::ABSENT),
        Literal::Null => out.push(tag::NULL),
        Literal::Bool(true) => out.push(tag::TRUE),
        Literal::Bool(false) => out.push(tag::FALSE),
        Literal::Number(n) => encode_number(n, out)?,
        Literal::String(s) => {
            out.push(tag::STRING);
            write_cstr(out, s, "string literal", true)?;
        }
        Literal::Array(items) => {
            out.push(tag::ARRAY);
            for item in items {
                if let Literal::Bool(false) = item {
                    out.push(tag::ELEMENT_FALSE);
                } else {
                    encode_literal(item, out)?;
                }
            }
            out.push(END);
        }
        Literal::Object(fields) => {
            out.push(tag::OBJECT);
            encode_pairs(fields.iter().map(|(k, v)| (k.as_str(), v)), out)?;
        }
    }
    Ok(())
}

fn encode_pairs<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a Literal)>,
    out: &mut Vec<u8>,
) -> Result<()> {
    for (key, value) in pairs {
        write_cstr(out, key, "object key", false)?;
        encode_literal(value, out)?;
    }
    out.push(END);
    Ok(())
}

fn encode_number(n: &Number, out: &mut Vec<u8>) -> Result<()> {
    if let Some(v) = n.as_i64() {
        if let Ok(small) = i32::try_from(v) {
            let biased = (i64::from(small) + INT32_BIAS) as u32;
            out.push(tag::INT32);
            out.extend_from_slice(&biased.to_be_bytes());
        } else {
            out.push(tag::INT64);
            out.extend_from_slice(&v.to_be_bytes());
        }
    } else if let Some(v) = n.as_u64() {
        out.push(tag::UINT64);
        out.extend_from_slice(&v.to_be_bytes());
    } else if let Some(v) = n.as_f64().filter(|v| v.is_finite()) {
        out.push(tag::FLOAT64);
        out.extend_from_slice(&v.to_bits().to_be_bytes());
    } else {
        return Err(DatasetError::UnencodableNumber(n.to_string()));
    }
    Ok(())
}

/// Append the encoding of a discriminator key (an object literal) to `out`.
///
/// Pairs are written sorted by path so that equal keys encode identically.
pub fn encode_key(key: &DiscriminatorKey, out: &mut Vec<u8>) -> Result<()> {
    let mut pairs: Vec<_> = key.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    out.push(tag::OBJECT);
    encode_pairs(pairs.into_iter(), out)
}

/// Encode a single literal into a fresh buffer.
pub fn literal_to_bytes(literal: &Literal) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_literal(literal, &mut out)?;
    Ok(out)
}

/// Decode a buffer holding exactly one literal.
pub fn literal_from_bytes(bytes: &[u8]) -> Result<Literal> {
    let mut reader = ByteReader::new(bytes);
    let literal = decode_literal(&mut reader, 1)?;
    if !reader.is_exhausted() {
        return Err(reader.corrupt("trailing bytes after literal"));
    }
    Ok(literal)
}

/// Decode a buffer holding exactly one discriminator key.
pub fn key_from_bytes(bytes: &[u8]) -> Result<DiscriminatorKey> {
    let mut reader = ByteReader::new(bytes);
    let key = decode_key(&mut reader)?;
    if !reader.is_exhausted() {
        return Err(reader.corrupt("trailing bytes after discriminator key"));
    }
    Ok(key)
}

pub(crate) fn decode_key(reader: &mut ByteReader<'_>) -> Result<DiscriminatorKey> {
    let at = reader.position();
    let tag = reader.read_u8()?;
    if tag != tag::OBJECT {
        return Err(DatasetError::InvalidDiscriminatorEncoding { offset: at, tag });
    }
    let pairs = decode_pairs(reader, 1)?;
    Ok(pairs.into_iter().collect())
}

fn decode_literal(reader: &mut ByteReader<'_>, depth: usize) -> Result<Literal> {
    decode_tagged(reader, depth, false)
}

fn decode_tagged(reader: &mut ByteReader<'_>, depth: usize, in_array: bool) -> Result<Literal> {
    if depth > MAX_LITERAL_DEPTH {
        return Err(reader.corrupt(format!("literal nesting exceeds {MAX_LITERAL_DEPTH}")));
    }
    let at = reader.position();
    let literal = match reader.read_u8()? {
        tag::FALSE => Literal::Bool(false),
        tag::ELEMENT_FALSE if in_array => Literal::Bool(false),
        tag::TRUE => Literal::Bool(true),
        tag::ABSENT => Literal::Absent,
        tag::NULL => Literal::Null,
        tag::INT32 => {
            let biased = u32::from_be_bytes(reader.read_array()?);
            Literal::Number(Number::from(i64::from(biased) - INT32_BIAS))
        }
        tag::INT64 => {
            let v = i64::from_be_bytes(reader.read_array()?);
            if i32::try_from(v).is_ok() {
                return Err(reader.corrupt_at(at, "i64 literal within i32 range"));
            }
            Literal::Number(Number::from(v))
        }
        tag::UINT64 => {
            let v = u64::from_be_bytes(reader.read_array()?);
            if i64::try_from(v).is_ok() {
                return Err(reader.corrupt_at(at, "u64 literal within i64 range"));
            }
            Literal::Number(Number::from(v))
        }
        tag::FLOAT64 => {
            let v = f64::from_bits(u64::from_be_bytes(reader.read_array()?));
            let n = Number::from_f64(v)
                .ok_or_else(|| reader.corrupt_at(at, "non-finite f64 literal"))?;
            Literal::Number(n)
        }
        tag::STRING => Literal::String(reader.read_cstr("string literal")?.to_string()),
        tag::ARRAY => {
            let mut items = Vec::new();
            while reader.peek()? != END {
                items.push(decode_tagged(reader, depth + 1, true)?);
            }
            reader.read_u8()?;
            Literal::Array(items)
        }
        tag::OBJECT => {
            let mut fields = BTreeMap::new();
            for (key, value) in decode_pairs(reader, depth)? {
                fields.insert(key, value);
            }
            Literal::Object(fields)
        }
        other => {
            return Err(reader.corrupt_at(at, format!("unknown literal tag {other:#04x}")));
        }
    };
    Ok(literal)
}

/// Read `key\0 literal` pairs up to the `0x00` terminator.
fn decode_pairs(reader: &mut ByteReader<'_>, depth: usize) -> Result<Vec<(String, Literal)>> {
    let mut pairs: Vec<(String, Literal)> = Vec::new();
    while reader.peek()? != END {
        let key_at = reader.position();
        let key = reader.read_cstr("object key")?;
        if pairs.iter().any(|(existing, _)| existing == key) {
            return Err(reader.corrupt_at(key_at, format!("duplicate object key `{key}`")));
        }
        let value = decode_literal(reader, depth + 1)?;
        pairs.push((key.to_string(), value));
    }
    reader.read_u8()?;
    Ok(pairs)
}
