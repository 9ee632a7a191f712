//! Typemap core library.
//!
//! Learns JSON schemas of gateway events from samples:
//! - [`engine`]: sample registration and discriminator keys
//! - [`persist`]: dataset file load/save
//! - [`ingest`]: gateway frame ingestion loop
//! - [`inspect`]: JSON view of a store and `events.json` import

pub mod engine;
pub mod exit_codes;
pub mod ingest;
pub mod inspect;
pub mod logging;
pub mod persist;

pub use engine::{extract_discriminator, register_sample, Registration, SchemaMapper};
pub use exit_codes::ExitCode;
pub use ingest::{IngestReport, IngestSession, IngestStats};
pub use persist::{DatasetFile, PersistError};
