//! JSON view of a schema store.
//!
//! Stores are rendered in the `events.json` layout used before the binary
//! dataset existed, and such documents can be imported back:
//!
//! ```text
//! { "EVENT": [ Type, { "where": {path: literal}, "data": Type }, ... ] }
//! Type = { "undef": bool, "types": [kind], "arr": Type|null, "obj": {name: Type}|null }
//! ```
//!
//! `Absent` key values have no JSON form and are left out of `where`. On
//! import, configured discriminator paths missing from `where` are restored
//! as `Absent`.

use std::collections::BTreeMap;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tm_common::{
    DiscriminatorKey, Error, EventSchema, Literal, Primitives, Result, SchemaEntry, SchemaStore,
    TypeNode,
};
use tm_config::DiscriminatorConfig;

/// Legacy rendering of a [`TypeNode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyType {
    #[serde(default)]
    pub undef: bool,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub arr: Option<Box<LegacyType>>,
    #[serde(default)]
    pub obj: Option<BTreeMap<String, LegacyType>>,
}

/// One discriminated entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEntry {
    #[serde(rename = "where")]
    pub selector: Map<String, Value>,
    pub data: LegacyType,
}

/// An event: its base type followed by its entries, as one JSON array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct LegacyEvent {
    pub base: LegacyType,
    pub entries: Vec<LegacyEntry>,
}

impl Serialize for LegacyEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + self.entries.len()))?;
        seq.serialize_element(&self.base)?;
        for entry in &self.entries {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

impl TryFrom<Vec<Value>> for LegacyEvent {
    type Error = String;

    fn try_from(items: Vec<Value>) -> std::result::Result<Self, Self::Error> {
        let mut items = items.into_iter();
        let base = items
            .next()
            .ok_or("event array is empty, expected the base type first")?;
        let base = serde_json::from_value(base).map_err(|e| format!("base type: {e}"))?;
        let entries = items
            .enumerate()
            .map(|(i, item)| serde_json::from_value(item).map_err(|e| format!("entry {i}: {e}")))
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self { base, entries })
    }
}

/// A whole `events.json` document.
pub type LegacyDocument = BTreeMap<String, LegacyEvent>;

pub fn render_node(node: &TypeNode) -> LegacyType {
    LegacyType {
        undef: node.optional,
        types: node.primitives.names().into_iter().map(String::from).collect(),
        arr: node.element.as_deref().map(|e| Box::new(render_node(e))),
        obj: node.fields.as_ref().map(|fields| {
            fields
                .iter()
                .map(|(name, child)| (name.clone(), render_node(child)))
                .collect()
        }),
    }
}

pub fn render_event(schema: &EventSchema) -> LegacyEvent {
    LegacyEvent {
        base: render_node(&schema.base),
        entries: schema
            .entries
            .iter()
            .map(|entry| LegacyEntry {
                selector: entry.key.to_map(),
                data: render_node(&entry.schema),
            })
            .collect(),
    }
}

pub fn render_store(store: &SchemaStore) -> LegacyDocument {
    store
        .iter()
        .map(|(name, schema)| (name.to_string(), render_event(schema)))
        .collect()
}

pub fn import_node(legacy: &LegacyType) -> Result<TypeNode> {
    let mut node = TypeNode::new();
    node.optional = legacy.undef;
    for name in &legacy.types {
        let kind = Primitives::from_kind_name(name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown type name `{name}`")))?;
        node.primitives.insert(kind);
    }
    if let Some(arr) = &legacy.arr {
        node.element = Some(Box::new(import_node(arr)?));
    }
    if let Some(obj) = &legacy.obj {
        let mut fields = BTreeMap::new();
        for (name, child) in obj {
            fields.insert(name.clone(), import_node(child)?);
        }
        node.fields = Some(fields);
    }
    Ok(node)
}

/// Rebuild a discriminator key from a `where` object.
///
/// With configured paths the key follows their order and paths missing
/// from `selector` become `Absent`; any other keys follow in name order.
fn import_key(selector: &Map<String, Value>, paths: Option<&[String]>) -> DiscriminatorKey {
    let mut key = DiscriminatorKey::new();
    let configured = paths.unwrap_or_default();
    for path in configured {
        let literal = selector.get(path).map_or(Literal::Absent, Literal::from);
        key.push(path.clone(), literal);
    }
    for (path, value) in selector {
        if !configured.contains(path) {
            key.push(path.clone(), Literal::from(value));
        }
    }
    key
}

/// Convert an `events.json` document into a store.
pub fn import_document(doc: &LegacyDocument, config: &DiscriminatorConfig) -> Result<SchemaStore> {
    let mut store = SchemaStore::new();
    for (name, event) in doc {
        let paths: Option<Vec<String>> = config
            .paths(name)
            .map(|paths| paths.iter().map(ToString::to_string).collect());

        let mut schema = EventSchema::new();
        schema.base = import_node(&event.base).map_err(in_event(name))?;
        for entry in &event.entries {
            let key = import_key(&entry.selector, paths.as_deref());
            if schema.find_entry(&key).is_some() {
                return Err(Error::InvalidInput(format!(
                    "event {name}: duplicate entry for {key}"
                )));
            }
            let mut imported = SchemaEntry::new(key);
            imported.schema = import_node(&entry.data).map_err(in_event(name))?;
            schema.entries.push(imported);
        }
        // Names come from a map, so they are unique.
        let _ = store.insert(name.clone(), schema);
    }
    Ok(store)
}

fn in_event(name: &str) -> impl Fn(Error) -> Error + '_ {
    move |err| match err {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("event {name}: {msg}")),
        other => other,
    }
}

/// Per-event counts for a quick look at a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub event: String,
    pub entries: usize,
    pub depth: usize,
}

pub fn summarize(store: &SchemaStore) -> Vec<EventSummary> {
    store
        .iter()
        .map(|(name, schema)| EventSummary {
            event: name.to_string(),
            entries: schema.entries.len(),
            depth: schema
                .entries
                .iter()
                .map(|entry| entry.schema.depth())
                .fold(schema.base.depth(), usize::max),
        })
        .collect()
}
