//! Typemap configuration loading and validation.
//!
//! This crate provides:
//! - The discriminator config (`.cfg`) parser and loader
//! - Runtime settings with resolution (CLI → env → defaults)

pub mod discriminator;
pub mod settings;

pub use discriminator::{ConfigError, DiscriminatorConfig};
pub use settings::Settings;

/// Default discriminator config file name.
pub const DEFAULT_CONFIG_FILE: &str = ".cfg";
