//! Dataset file format.
//!
//! The schema store is persisted as a single gzip-compressed buffer of
//! flag-byte encoded nodes and tag-byte encoded discriminator keys:
//!
//! - [`node_codec`]: one [`tm_common::TypeNode`] per flag byte
//! - [`literal_codec`]: literals and discriminator keys
//! - [`store_codec`]: event framing plus compression
//!
//! Decoding never trusts its input: truncation, unknown tags, reserved bits,
//! duplicate names and excessive nesting are all reported as errors.

mod bytes;
pub mod error;
pub mod literal_codec;
pub mod node_codec;
pub mod store_codec;

pub use error::{DatasetError, Result};
pub use literal_codec::{key_from_bytes, literal_from_bytes, literal_to_bytes};
pub use node_codec::{check_field_names, node_from_bytes, node_to_bytes, MAX_NODE_DEPTH};
pub use store_codec::{check_sample, decode_store, encode_store};
