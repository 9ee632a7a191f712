//! The per-event schema store.
//!
//! Events keep their first-seen (insertion) order, which is also the order
//! they are written to the dataset file.

use std::collections::HashMap;

use crate::literal::DiscriminatorKey;
use crate::node::TypeNode;

/// A discriminated sub-schema: every sample whose discriminator key equals
/// `key` has been merged into `schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub key: DiscriminatorKey,
    pub schema: TypeNode,
}

impl SchemaEntry {
    pub fn new(key: DiscriminatorKey) -> Self {
        Self {
            key,
            schema: TypeNode::new(),
        }
    }
}

/// Learned schema for one event name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSchema {
    /// Widened by every sample of the event.
    pub base: TypeNode,
    /// One entry per distinct discriminator key, in first-seen order.
    pub entries: Vec<SchemaEntry>,
}

impl EventSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the entry whose key structurally equals `key`.
    pub fn find_entry(&self, key: &DiscriminatorKey) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key == key)
    }
}

/// Mapping from event name to its learned schema, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    events: Vec<(String, EventSchema)>,
    index: HashMap<String, usize>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.index.contains_key(event)
    }

    pub fn get(&self, event: &str) -> Option<&EventSchema> {
        self.index.get(event).map(|&i| &self.events[i].1)
    }

    /// Get the schema for `event`, appending an empty one if unseen.
    ///
    /// The returned flag is true when the event was newly created.
    pub fn get_or_insert(&mut self, event: &str) -> (&mut EventSchema, bool) {
        let (i, created) = match self.index.get(event) {
            Some(&i) => (i, false),
            None => {
                let i = self.events.len();
                self.events.push((event.to_string(), EventSchema::new()));
                self.index.insert(event.to_string(), i);
                (i, true)
            }
        };
        (&mut self.events[i].1, created)
    }

    /// Append a fully built schema.
    ///
    /// Returns the schema back if the event already exists.
    pub fn insert(&mut self, event: String, schema: EventSchema) -> Result<(), EventSchema> {
        if self.index.contains_key(&event) {
            return Err(schema);
        }
        self.index.insert(event.clone(), self.events.len());
        self.events.push((event, schema));
        Ok(())
    }

    /// Iterate events in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventSchema)> {
        self.events.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Event names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|(name, _)| name.as_str())
    }

    /// Total number of discriminated entries across all events.
    pub fn entry_count(&self) -> usize {
        self.events.iter().map(|(_, schema)| schema.entries.len()).sum()
    }
}

impl PartialEq for SchemaStore {
    fn eq(&self, other: &Self) -> bool {
        self.events == other.events
    }
}

impl Eq for SchemaStore {}
