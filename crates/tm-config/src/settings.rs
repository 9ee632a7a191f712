//! Runtime settings.
//!
//! Values are resolved CLI → environment → defaults. The CLI layer (clap
//! with `env` fallbacks) supplies overrides; anything left unset falls back
//! to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATASET_PATH: &str = "types/dataset";

/// Default interval between periodic saves.
pub const DEFAULT_SAVE_INTERVAL_SECS: u64 = 60;

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Dataset file holding the persisted schema store.
    pub dataset_path: PathBuf,
    /// Discriminator config file.
    pub config_path: PathBuf,
    /// Interval between periodic saves; `None` disables them.
    #[serde(with = "interval_secs")]
    pub save_interval: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            config_path: PathBuf::from(crate::DEFAULT_CONFIG_FILE),
            save_interval: Some(Duration::from_secs(DEFAULT_SAVE_INTERVAL_SECS)),
        }
    }
}

impl Settings {
    /// Apply overrides on top of the defaults.
    ///
    /// A save interval of zero seconds disables periodic saves.
    pub fn resolve(
        dataset_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
        save_interval_secs: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            dataset_path: dataset_path.unwrap_or(defaults.dataset_path),
            config_path: config_path.unwrap_or(defaults.config_path),
            save_interval: match save_interval_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.save_interval,
            },
        }
    }
}

mod interval_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(d.as_secs()),
            None => s.serialize_none(),
        }
    }
}
