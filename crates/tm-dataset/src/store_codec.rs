//! Whole-store framing and compression.
//!
//! The decompressed layout is a sequence of events followed by a `0x00`:
//!
//! ```text
//! event_name\0  base_node  (key schema_node)*  0x00
//! ```
//!
//! Each key starts with the object tag `0x07`, which is how the entry list is
//! told apart from its terminator. The concatenation is gzip-compressed as a
//! single gzip member; anything after it is rejected. An empty input decodes
//! to an empty store.

use std::io::{self, Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use tm_common::{DiscriminatorKey, EventSchema, SchemaEntry, SchemaStore};
use tracing::debug;

use crate::bytes::{check_cstr, write_cstr, ByteReader};
use crate::error::{DatasetError, Result};
use crate::literal_codec::{decode_key, encode_key};
use crate::node_codec::{check_field_names, decode_node, encode_node};

const ENTRY_TAG: u8 = 0x07;
const END: u8 = 0x00;

/// Serialize and compress the whole store.
pub fn encode_store(store: &SchemaStore) -> Result<Vec<u8>> {
    let raw = encode_store_raw(store)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;
    debug!(
        events = store.len(),
        entries = store.entry_count(),
        raw_bytes = raw.len(),
        compressed_bytes = compressed.len(),
        "encoded schema store"
    );
    Ok(compressed)
}

/// Serialize the store without compression.
pub fn encode_store_raw(store: &SchemaStore) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (name, schema) in store.iter() {
        write_cstr(&mut out, name, "event name", true)?;
        encode_node(&schema.base, &mut out)?;
        for entry in &schema.entries {
            encode_key(&entry.key, &mut out)?;
            encode_node(&entry.schema, &mut out)?;
        }
        out.push(END);
    }
    Ok(out)
}

/// Decompress and deserialize a store.
pub fn decode_store(bytes: &[u8]) -> Result<SchemaStore> {
    if bytes.is_empty() {
        return Ok(SchemaStore::new());
    }
    let mut raw = Vec::new();
    let mut decoder = GzDecoder::new(bytes);
    decoder
        .read_to_end(&mut raw)
        .map_err(DatasetError::DecompressionFailure)?;
    let trailing = decoder.into_inner().len();
    if trailing > 0 {
        return Err(DatasetError::DecompressionFailure(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{trailing} trailing bytes after the gzip stream"),
        )));
    }
    let store = decode_store_raw(&raw)?;
    debug!(
        events = store.len(),
        entries = store.entry_count(),
        compressed_bytes = bytes.len(),
        raw_bytes = raw.len(),
        "decoded schema store"
    );
    Ok(store)
}

/// Check that registering `value` under `event` leaves a store encodable.
///
/// `key` is the discriminator key the sample would be filed under, if the
/// event is discriminated.
pub fn check_sample(event: &str, value: &Value, key: Option<&DiscriminatorKey>) -> Result<()> {
    check_cstr(event, "event name", true)?;
    check_field_names(value)?;
    if let Some(key) = key {
        encode_key(key, &mut Vec::new())?;
    }
    Ok(())
}

/// Deserialize an uncompressed store.
pub fn decode_store_raw(raw: &[u8]) -> Result<SchemaStore> {
    let mut reader = ByteReader::new(raw);
    let mut store = SchemaStore::new();

    while !reader.is_exhausted() {
        let name_at = reader.position();
        let name = reader.read_cstr("event name")?;
        let mut schema = EventSchema::new();
        schema.base = decode_node(&mut reader)?;

        loop {
            let at = reader.position();
            match reader.peek()? {
                END => {
                    reader.read_u8()?;
                    break;
                }
                ENTRY_TAG => {
                    let key = decode_key(&mut reader)?;
                    if schema.find_entry(&key).is_some() {
                        return Err(reader.corrupt_at(at, format!("duplicate key {key} in {name}")));
                    }
                    let mut entry = SchemaEntry::new(key);
                    entry.schema = decode_node(&mut reader)?;
                    schema.entries.push(entry);
                }
                tag => return Err(DatasetError::InvalidDiscriminatorEncoding { offset: at, tag }),
            }
        }

        if store.insert(name.to_string(), schema).is_err() {
            return Err(reader.corrupt_at(name_at, format!("duplicate event `{name}`")));
        }
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tm_common::{DiscriminatorKey, Literal, TypeNode};

    fn ping_store() -> SchemaStore {
        let mut store = SchemaStore::new();
        let (schema, _) = store.get_or_insert("PING");
        schema.base.merge(&json!({"a": 1}));
        store
    }

    #[test]
    fn test_empty_input_is_empty_store() {
        assert!(decode_store(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_layout() {
        assert!(encode_store_raw(&SchemaStore::new()).unwrap().is_empty());
        let bytes = encode_store(&SchemaStore::new()).unwrap();
        assert!(!bytes.is_empty());
        assert!(decode_store(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_ping_layout() {
        let raw = encode_store_raw(&ping_store()).unwrap();
        assert_eq!(
            raw,
            vec![b'P', b'I', b'N', b'G', 0, 0x80, b'a', 0, 0x04, 0x00, 0x00]
        );
        assert_eq!(decode_store_raw(&raw).unwrap(), ping_store());
    }

    #[test]
    fn test_entries_roundtrip_in_order() {
        let mut store = SchemaStore::new();
        let (schema, _) = store.get_or_insert("MSG");
        for t in [2, 1] {
            let mut key = DiscriminatorKey::new();
            key.push("t", Literal::from(json!(t)));
            key.push("u.id", Literal::Absent);
            let mut entry = SchemaEntry::new(key);
            entry.schema = TypeNode::from_value(&json!({"t": t}));
            schema.entries.push(entry);
        }
        store.get_or_insert("ALPHA");

        let decoded = decode_store(&encode_store(&store).unwrap()).unwrap();
        assert_eq!(decoded, store);
        assert_eq!(decoded.names().collect::<Vec<_>>(), vec!["MSG", "ALPHA"]);
        let entries = &decoded.get("MSG").unwrap().entries;
        assert_eq!(entries[0].key.get("t"), Some(&Literal::from(json!(2))));
        assert_eq!(entries[1].key.get("u.id"), Some(&Literal::Absent));
    }

    #[test]
    fn test_garbage_is_decompression_failure() {
        assert!(matches!(
            decode_store(b"not gzip at all"),
            Err(DatasetError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_truncated_gzip_is_decompression_failure() {
        let bytes = encode_store(&ping_store()).unwrap();
        assert!(matches!(
            decode_store(&bytes[..bytes.len() - 6]),
            Err(DatasetError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_are_decompression_failure() {
        let mut bytes = encode_store(&ping_store()).unwrap();
        bytes.extend_from_slice(b"junk");
        assert!(matches!(
            decode_store(&bytes),
            Err(DatasetError::DecompressionFailure(_))
        ));

        // A second gzip member is not part of the dataset either.
        let mut doubled = encode_store(&ping_store()).unwrap();
        doubled.extend(encode_store(&SchemaStore::new()).unwrap());
        assert!(matches!(
            decode_store(&doubled),
            Err(DatasetError::DecompressionFailure(_))
        ));
    }

    #[test]
    fn test_check_sample() {
        let mut key = DiscriminatorKey::new();
        key.push("t", Literal::from(json!("a")));
        assert!(check_sample("E", &json!({"t": "a", "n": [{"x": 1}]}), Some(&key)).is_ok());

        assert!(matches!(
            check_sample("E", &json!({"": 1}), None),
            Err(DatasetError::UnencodableString { what: "field name", .. })
        ));
        assert!(check_sample("BAD\0NAME", &json!(1), None).is_err());

        let mut nul = DiscriminatorKey::new();
        nul.push("t", Literal::from(json!("a\u{0}b")));
        assert!(matches!(
            check_sample("E", &json!({"t": "a\u{0}b"}), Some(&nul)),
            Err(DatasetError::UnencodableString { what: "string literal", .. })
        ));
    }

    #[test]
    fn test_bad_entry_tag() {
        let raw = [b'E', 0, 0x00, 0x06, 0x00];
        assert!(matches!(
            decode_store_raw(&raw),
            Err(DatasetError::InvalidDiscriminatorEncoding { offset: 3, tag: 0x06 })
        ));
    }

    #[test]
    fn test_missing_event_terminator() {
        assert!(matches!(
            decode_store_raw(&[b'E', 0, 0x00]),
            Err(DatasetError::CorruptSchemaData { .. })
        ));
    }

    #[test]
    fn test_duplicate_event_is_corrupt() {
        let raw = [b'E', 0, 0x00, 0x00, b'E', 0, 0x00, 0x00];
        assert!(matches!(
            decode_store_raw(&raw),
            Err(DatasetError::CorruptSchemaData { offset: 4, .. })
        ));
    }

    #[test]
    fn test_duplicate_key_is_corrupt() {
        let raw = [b'E', 0, 0x00, 0x07, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00];
        assert!(matches!(
            decode_store_raw(&raw),
            Err(DatasetError::CorruptSchemaData { offset: 6, .. })
        ));
    }

    #[test]
    fn test_event_name_with_nul_is_unencodable() {
        let mut store = SchemaStore::new();
        store.get_or_insert("BAD\0NAME");
        assert!(matches!(
            encode_store(&store),
            Err(DatasetError::UnencodableString { what: "event name", .. })
        ));
    }
}
