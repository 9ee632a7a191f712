//! The type lattice.
//!
//! A [`TypeNode`] describes the union of every JSON shape observed at one
//! position of a payload. Merging a value only ever widens a node: primitive
//! tags, field names and the `optional` flag are never removed once set.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde_json::Value;

bitflags! {
    /// Primitive JSON kinds observed directly at a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Primitives: u8 {
        const STRING = 1 << 0;
        const NUMBER = 1 << 1;
        const BOOLEAN = 1 << 2;
        const NULL = 1 << 3;
    }
}

impl Primitives {
    /// The primitive kind of `value`, or `None` for arrays and objects.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::STRING),
            Value::Number(_) => Some(Self::NUMBER),
            Value::Bool(_) => Some(Self::BOOLEAN),
            Value::Null => Some(Self::NULL),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Parse a kind name as used in the JSON view (`"string"`, `"number"`, ...).
    pub fn from_kind_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::STRING),
            "number" => Some(Self::NUMBER),
            "boolean" => Some(Self::BOOLEAN),
            "null" => Some(Self::NULL),
            _ => None,
        }
    }

    /// Names of the contained kinds, in a fixed order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(4);
        for (name, flag) in [
            ("string", Self::STRING),
            ("number", Self::NUMBER),
            ("boolean", Self::BOOLEAN),
            ("null", Self::NULL),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        names
    }
}

/// Inferred shape of one or more JSON values.
///
/// `element` and `fields` may both be present when the same slot has been
/// observed as an array in one sample and as an object in another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeNode {
    /// Set once a sample that should have carried this slot omitted it.
    pub optional: bool,
    /// Primitive kinds observed at this node.
    pub primitives: Primitives,
    /// Shared element shape of every array observed here.
    pub element: Option<Box<TypeNode>>,
    /// Field shapes of every object observed here.
    pub fields: Option<BTreeMap<String, TypeNode>>,
}

impl TypeNode {
    /// Create an empty node (nothing observed yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node describing a single value.
    pub fn from_value(value: &Value) -> Self {
        let mut node = Self::new();
        node.merge(value);
        node
    }

    /// True if nothing has been observed at this node.
    pub fn is_empty(&self) -> bool {
        !self.optional
            && self.primitives.is_empty()
            && self.element.is_none()
            && self.fields.is_none()
    }

    /// Widen this node so that it also describes `value`.
    pub fn merge(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                let element = self.element.get_or_insert_with(Box::default);
                for item in items {
                    element.merge(item);
                }
            }
            Value::Object(map) => {
                let fields = self.fields.get_or_insert_with(BTreeMap::new);
                for (name, child) in fields.iter_mut() {
                    if !map.contains_key(name) {
                        child.optional = true;
                    }
                }
                for (name, child_value) in map {
                    match fields.get_mut(name) {
                        Some(child) => child.merge(child_value),
                        None => {
                            fields.insert(name.clone(), Self::from_value(child_value));
                        }
                    }
                }
            }
            primitive => {
                if let Some(kind) = Primitives::of(primitive) {
                    self.primitives.insert(kind);
                }
            }
        }
    }

    /// Look up a direct child field.
    pub fn field(&self, name: &str) -> Option<&TypeNode> {
        self.fields.as_ref().and_then(|fields| fields.get(name))
    }

    /// Check whether a primitive kind has been observed here.
    pub fn has(&self, kind: Primitives) -> bool {
        self.primitives.contains(kind)
    }

    /// Maximum nesting depth of this node (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        let element = self.element.as_ref().map_or(0, |e| e.depth());
        let fields = self
            .fields
            .as_ref()
            .and_then(|fields| fields.values().map(TypeNode::depth).max())
            .unwrap_or(0);
        1 + element.max(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_scenario() {
        let mut node = TypeNode::new();
        node.merge(&json!(1));
        node.merge(&json!(true));
        node.merge(&json!("hi"));

        assert_eq!(
            node.primitives,
            Primitives::NUMBER | Primitives::BOOLEAN | Primitives::STRING
        );
        assert!(node.element.is_none());
        assert!(node.fields.is_none());
        assert!(!node.optional);
    }

    #[test]
    fn test_missing_key_becomes_optional() {
        let mut node = TypeNode::new();
        node.merge(&json!({"k": 1}));
        node.merge(&json!({}));
        assert!(node.field("k").unwrap().optional);
    }

    #[test]
    fn test_optional_is_sticky() {
        let mut node = TypeNode::new();
        node.merge(&json!({}));
        node.merge(&json!({"k": 1}));
        assert!(!node.field("k").unwrap().optional);

        node.merge(&json!({}));
        assert!(node.field("k").unwrap().optional);

        node.merge(&json!({"k": 2}));
        assert!(node.field("k").unwrap().optional);
    }

    #[test]
    fn test_array_elements_share_one_node() {
        let node = TypeNode::from_value(&json!([1, "a", {"x": null}]));
        let element = node.element.as_ref().unwrap();
        assert!(element.has(Primitives::NUMBER));
        assert!(element.has(Primitives::STRING));
        assert!(element.field("x").unwrap().has(Primitives::NULL));
        assert!(node.primitives.is_empty());
    }

    #[test]
    fn test_empty_array_creates_empty_element() {
        let node = TypeNode::from_value(&json!([]));
        assert!(node.element.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_array_and_object_union() {
        let mut node = TypeNode::new();
        node.merge(&json!([1]));
        node.merge(&json!({"a": "b"}));
        node.merge(&json!(null));

        assert!(node.element.is_some());
        assert!(node.fields.is_some());
        assert!(node.has(Primitives::NULL));
    }

    #[test]
    fn test_nested_optional_inside_array() {
        let node = TypeNode::from_value(&json!([{"a": 1, "b": 2}, {"a": 3}]));
        let element = node.element.as_ref().unwrap();
        assert!(!element.field("a").unwrap().optional);
        assert!(element.field("b").unwrap().optional);
    }

    #[test]
    fn test_primitive_names_roundtrip() {
        let all = Primitives::all();
        let names = all.names();
        assert_eq!(names, vec!["string", "number", "boolean", "null"]);
        let rebuilt = names
            .iter()
            .filter_map(|n| Primitives::from_kind_name(n))
            .fold(Primitives::empty(), |acc, p| acc | p);
        assert_eq!(rebuilt, all);
        assert_eq!(Primitives::from_kind_name("undefined"), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(TypeNode::new().depth(), 1);
        assert_eq!(TypeNode::from_value(&json!({"a": [{"b": 1}]})).depth(), 4);
    }
}
