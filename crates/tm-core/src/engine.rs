//! Schema engine.
//!
//! Every sample widens its event's base schema. Events with configured
//! discriminator paths additionally keep one sub-schema per distinct
//! discriminator key, so that e.g. different message types of the same
//! event are described separately.

use serde_json::Value;
use tm_common::{DiscriminatorKey, FieldPath, SchemaEntry, SchemaStore};
use tm_config::DiscriminatorConfig;
use tracing::debug;

/// What a registration did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First sample of this event.
    NewEvent,
    /// First sample of a known event with this discriminator key.
    NewVariant { index: usize },
    /// Merged into existing schemas.
    Merged,
}

/// Build the discriminator key for `value`: one entry per path, named by the
/// dotted path, holding the literal found there or `Absent`.
pub fn extract_discriminator(paths: &[FieldPath], value: &Value) -> DiscriminatorKey {
    paths
        .iter()
        .map(|path| (path.to_string(), path.resolve(value)))
        .collect()
}

/// Merge one sample of `event` into `store`.
///
/// A sample that creates its event reports [`Registration::NewEvent`] even
/// when it also creates the event's first entry.
pub fn register_sample(
    store: &mut SchemaStore,
    config: &DiscriminatorConfig,
    event: &str,
    value: &Value,
) -> Registration {
    let (schema, created) = store.get_or_insert(event);
    schema.base.merge(value);

    let mut outcome = if created {
        Registration::NewEvent
    } else {
        Registration::Merged
    };

    let Some(paths) = config.paths(event) else {
        return outcome;
    };

    let key = extract_discriminator(paths, value);
    let index = match schema.find_entry(&key) {
        Some(index) => index,
        None => {
            schema.entries.push(SchemaEntry::new(key));
            let index = schema.entries.len() - 1;
            if !created {
                outcome = Registration::NewVariant { index };
            }
            index
        }
    };
    schema.entries[index].schema.merge(value);
    outcome
}

/// Owns a store and its config for a long-running ingestion.
#[derive(Debug, Default)]
pub struct SchemaMapper {
    store: SchemaStore,
    config: DiscriminatorConfig,
    dirty: bool,
}

impl SchemaMapper {
    pub fn new(store: SchemaStore, config: DiscriminatorConfig) -> Self {
        Self {
            store,
            config,
            dirty: false,
        }
    }

    /// Check that `value` can be registered under `event` without making
    /// the store unencodable.
    pub fn check(&self, event: &str, value: &Value) -> tm_dataset::Result<()> {
        let key = self
            .config
            .paths(event)
            .map(|paths| extract_discriminator(paths, value));
        tm_dataset::check_sample(event, value, key.as_ref())
    }

    /// Register a sample and mark the store as changed.
    pub fn register(&mut self, event: &str, value: &Value) -> Registration {
        let outcome = register_sample(&mut self.store, &self.config, event, value);
        self.dirty = true;
        match outcome {
            Registration::NewEvent => debug!(event, "new event"),
            Registration::NewVariant { index } => {
                debug!(event, index, "new discriminator variant")
            }
            Registration::Merged => {}
        }
        outcome
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }

    /// True if samples were registered since the last [`mark_clean`](Self::mark_clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn into_store(self) -> SchemaStore {
        self.store
    }
}
