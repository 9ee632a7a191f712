//! Node encoding.
//!
//! A node is one flag byte followed by its children:
//!
//! ```text
//! flags            u8  (0x01 optional, 0x02 string, 0x04 number,
//!                       0x08 boolean, 0x10 null, 0x40 element, 0x80 fields)
//! [element node]       present iff 0x40
//! [name\0 node]*  0x00 present iff 0x80, names in sorted order
//! ```
//!
//! Bit `0x20` is reserved and never written.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde_json::Value;
use tm_common::{Primitives, TypeNode};

use crate::bytes::{check_cstr, write_cstr, ByteReader};
use crate::error::Result;

/// Deepest node nesting accepted when decoding.
pub const MAX_NODE_DEPTH: usize = 256;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct NodeFlags: u8 {
        const OPTIONAL = 0x01;
        const STRING = 0x02;
        const NUMBER = 0x04;
        const BOOLEAN = 0x08;
        const NULL = 0x10;
        const ELEMENT = 0x40;
        const FIELDS = 0x80;
    }
}

const PRIMITIVE_FLAGS: [(Primitives, NodeFlags); 4] = [
    (Primitives::STRING, NodeFlags::STRING),
    (Primitives::NUMBER, NodeFlags::NUMBER),
    (Primitives::BOOLEAN, NodeFlags::BOOLEAN),
    (Primitives::NULL, NodeFlags::NULL),
];

fn flags_of(node: &TypeNode) -> NodeFlags {
    let mut flags = NodeFlags::empty();
    flags.set(NodeFlags::OPTIONAL, node.optional);
    for (kind, flag) in PRIMITIVE_FLAGS {
        flags.set(flag, node.primitives.contains(kind));
    }
    flags.set(NodeFlags::ELEMENT, node.element.is_some());
    flags.set(NodeFlags::FIELDS, node.fields.is_some());
    flags
}

/// Append the encoding of `node` to `out`.
pub fn encode_node(node: &TypeNode, out: &mut Vec<u8>) -> Result<()> {
    out.push(flags_of(node).bits());
    if let Some(element) = &node.element {
        encode_node(element, out)?;
    }
    if let Some(fields) = &node.fields {
        for (name, child) in fields {
            write_cstr(out, name, "field name", false)?;
            encode_node(child, out)?;
        }
        out.push(0);
    }
    Ok(())
}

/// Check that every object key in `value` can be written as a field name,
/// so that merging `value` into a node keeps the node encodable.
pub fn check_field_names(value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => items.iter().try_for_each(check_field_names),
        Value::Object(map) => map.iter().try_for_each(|(name, child)| {
            check_cstr(name, "field name", false)?;
            check_field_names(child)
        }),
        _ => Ok(()),
    }
}

/// Encode a single node into a fresh buffer.
pub fn node_to_bytes(node: &TypeNode) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_node(node, &mut out)?;
    Ok(out)
}

/// Decode a buffer holding exactly one node.
pub fn node_from_bytes(bytes: &[u8]) -> Result<TypeNode> {
    let mut reader = ByteReader::new(bytes);
    let node = decode_node(&mut reader)?;
    if !reader.is_exhausted() {
        return Err(reader.corrupt("trailing bytes after node"));
    }
    Ok(node)
}

pub(crate) fn decode_node(reader: &mut ByteReader<'_>) -> Result<TypeNode> {
    decode_at(reader, 1)
}

fn decode_at(reader: &mut ByteReader<'_>, depth: usize) -> Result<TypeNode> {
    if depth > MAX_NODE_DEPTH {
        return Err(reader.corrupt(format!("node nesting exceeds {MAX_NODE_DEPTH}")));
    }

    let at = reader.position();
    let byte = reader.read_u8()?;
    let flags = NodeFlags::from_bits(byte)
        .ok_or_else(|| reader.corrupt_at(at, format!("reserved node flag bit set in {byte:#04x}")))?;

    let mut node = TypeNode::new();
    node.optional = flags.contains(NodeFlags::OPTIONAL);
    for (kind, flag) in PRIMITIVE_FLAGS {
        if flags.contains(flag) {
            node.primitives.insert(kind);
        }
    }

    if flags.contains(NodeFlags::ELEMENT) {
        node.element = Some(Box::new(decode_at(reader, depth + 1)?));
    }

    if flags.contains(NodeFlags::FIELDS) {
        let mut fields = BTreeMap::new();
        while reader.peek()? != 0 {
            let name_at = reader.position();
            let name = reader.read_cstr("field name")?;
            let child = decode_at(reader, depth + 1)?;
            if fields.insert(name.to_string(), child).is_some() {
                return Err(reader.corrupt_at(name_at, format!("duplicate field `{name}`")));
            }
        }
        reader.read_u8()?;
        node.fields = Some(fields);
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use serde_json::json;

    #[test]
    fn test_empty_node_is_one_zero_byte() {
        assert_eq!(node_to_bytes(&TypeNode::new()).unwrap(), vec![0x00]);
        assert_eq!(node_from_bytes(&[0x00]).unwrap(), TypeNode::new());
    }

    #[test]
    fn test_primitive_flags() {
        let mut node = TypeNode::from_value(&json!("s"));
        node.merge(&json!(null));
        node.optional = true;
        assert_eq!(node_to_bytes(&node).unwrap(), vec![0x01 | 0x02 | 0x10]);

        let node = TypeNode::from_value(&json!(false));
        assert_eq!(node_to_bytes(&node).unwrap(), vec![0x08]);
    }

    #[test]
    fn test_object_layout() {
        // {"op": 1, "d": null} -> fields sorted: d, op
        let node = TypeNode::from_value(&json!({"op": 1, "d": null}));
        let bytes = node_to_bytes(&node).unwrap();
        assert_eq!(
            bytes,
            vec![0x80, b'd', 0, 0x10, b'o', b'p', 0, 0x04, 0x00]
        );
        assert_eq!(node_from_bytes(&bytes).unwrap(), node);
    }

    #[test]
    fn test_array_layout() {
        let node = TypeNode::from_value(&json!([1, "a"]));
        assert_eq!(node_to_bytes(&node).unwrap(), vec![0x40, 0x06]);

        let empty = TypeNode::from_value(&json!([]));
        assert_eq!(node_to_bytes(&empty).unwrap(), vec![0x40, 0x00]);
    }

    #[test]
    fn test_array_and_object_union_roundtrips() {
        let mut node = TypeNode::from_value(&json!([{"a": 1}]));
        node.merge(&json!({"b": [true], "c": {}}));
        node.merge(&json!({"c": {"d": "x"}}));
        let bytes = node_to_bytes(&node).unwrap();
        assert_eq!(bytes[0], 0x40 | 0x80);
        assert_eq!(node_from_bytes(&bytes).unwrap(), node);
    }

    #[test]
    fn test_field_name_check_walks_arrays_and_objects() {
        assert!(check_field_names(&json!({"a": [{"b": {"c": 1}}], "d": null})).is_ok());
        assert!(check_field_names(&json!("")).is_ok());
        assert!(matches!(
            check_field_names(&json!({"a": [{"": 1}]})),
            Err(DatasetError::UnencodableString { what: "field name", .. })
        ));
        assert!(check_field_names(&json!([{"x\u{0}y": true}])).is_err());
    }

    #[test]
    fn test_reserved_bit_is_corrupt() {
        assert!(matches!(
            node_from_bytes(&[0x20]),
            Err(DatasetError::CorruptSchemaData { offset: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_node_is_corrupt() {
        assert!(node_from_bytes(&[]).is_err());
        assert!(node_from_bytes(&[0x40]).is_err());
        assert!(node_from_bytes(&[0x80, b'a', 0, 0x02]).is_err());
        assert!(node_from_bytes(&[0x80, b'a']).is_err());
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        assert!(node_from_bytes(&[0x02, 0x02]).is_err());
    }

    #[test]
    fn test_duplicate_field_is_corrupt() {
        let bytes = [0x80, b'a', 0, 0x02, b'a', 0, 0x04, 0x00];
        assert!(matches!(
            node_from_bytes(&bytes),
            Err(DatasetError::CorruptSchemaData { offset: 4, .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut ok = vec![0x40; MAX_NODE_DEPTH - 1];
        ok.push(0x00);
        let node = node_from_bytes(&ok).unwrap();
        assert_eq!(node.depth(), MAX_NODE_DEPTH);

        let mut too_deep = vec![0x40; MAX_NODE_DEPTH];
        too_deep.push(0x00);
        assert!(node_from_bytes(&too_deep).is_err());
    }

    #[test]
    fn test_empty_field_name_is_unencodable() {
        let node = TypeNode::from_value(&json!({"": 1}));
        assert!(matches!(
            node_to_bytes(&node),
            Err(DatasetError::UnencodableString { what: "field name", .. })
        ));
    }
}
