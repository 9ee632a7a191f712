//! Typemap common types and errors.
//!
//! This crate provides the foundational types shared across the typemap crates:
//! - The `TypeNode` lattice that describes the inferred shape of JSON values
//! - Literal values (with an "absent" sentinel) used as discriminator keys
//! - Dotted field paths
//! - The per-event schema store
//! - The unified error type

pub mod error;
pub mod literal;
pub mod node;
pub mod path;
pub mod store;

pub use error::{Error, Result};
pub use literal::{DiscriminatorKey, Literal};
pub use node::{Primitives, TypeNode};
pub use path::FieldPath;
pub use store::{EventSchema, SchemaEntry, SchemaStore};
