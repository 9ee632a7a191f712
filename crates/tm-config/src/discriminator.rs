//! Discriminator configuration.
//!
//! The config file names, per event, the field paths whose literal values
//! split that event's samples into separate schema entries:
//!
//! ```text
//! [MESSAGE_CREATE]
//! type
//! author.bot
//!
//! [INTERACTION_CREATE]
//! type
//! data.name
//! ```
//!
//! A section runs from its `[EVENT_NAME]` header to the next blank line,
//! header, or end of file, and must list at least one path. Lines starting
//! with `#` are comments.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tm_common::FieldPath;
use tracing::{debug, warn};

/// Errors from loading the discriminator config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid discriminator config at line {line}: {reason}")]
    InvalidDiscriminatorConfig { line: usize, reason: String },
}

impl ConfigError {
    fn invalid(line: usize, reason: impl Into<String>) -> Self {
        ConfigError::InvalidDiscriminatorConfig {
            line,
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for tm_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { source, .. } => tm_common::Error::Io(source),
            ConfigError::InvalidDiscriminatorConfig { line, reason } => {
                tm_common::Error::InvalidDiscriminatorConfig { line, reason }
            }
        }
    }
}

/// Per-event discriminator field paths. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscriminatorConfig {
    events: HashMap<String, Vec<FieldPath>>,
}

impl DiscriminatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file. A missing file yields an empty config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no discriminator config, using none");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            events = config.len(),
            "discriminator config loaded"
        );
        Ok(config)
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        SectionParser::new().parse(content)
    }

    /// Set the discriminator paths for an event, replacing earlier ones.
    pub fn insert(&mut self, event: impl Into<String>, paths: Vec<FieldPath>) {
        self.events.insert(event.into(), paths);
    }

    /// Discriminator paths for `event`, if configured.
    pub fn paths(&self, event: &str) -> Option<&[FieldPath]> {
        self.events.get(event).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Configured events sorted by name.
    pub fn events(&self) -> Vec<(&str, &[FieldPath])> {
        let mut events: Vec<_> = self
            .events
            .iter()
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
            .collect();
        events.sort_by(|a, b| a.0.cmp(b.0));
        events
    }
}

struct SectionParser {
    header: Regex,
    path: Regex,
}

struct OpenSection {
    event: String,
    line: usize,
    paths: Vec<FieldPath>,
}

impl SectionParser {
    fn new() -> Self {
        Self {
            header: Regex::new(r"^\[([A-Z_]+)\]$").expect("static regex"),
            path: Regex::new(r"^[A-Za-z0-9_.]+$").expect("static regex"),
        }
    }

    fn parse(&self, content: &str) -> Result<DiscriminatorConfig, ConfigError> {
        let mut config = DiscriminatorConfig::new();
        let mut open: Option<OpenSection> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() {
                if let Some(section) = open.take() {
                    Self::close(&mut config, section)?;
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            if let Some(caps) = self.header.captures(line) {
                if let Some(section) = open.take() {
                    Self::close(&mut config, section)?;
                }
                open = Some(OpenSection {
                    event: caps[1].to_string(),
                    line: line_no,
                    paths: Vec::new(),
                });
                continue;
            }

            if line.starts_with('[') {
                return Err(ConfigError::invalid(
                    line_no,
                    format!("invalid section header `{line}`, expected [EVENT_NAME] using A-Z and _"),
                ));
            }

            let section = open.as_mut().ok_or_else(|| {
                ConfigError::invalid(line_no, format!("field path `{line}` outside of a section"))
            })?;

            if !self.path.is_match(line) {
                return Err(ConfigError::invalid(
                    line_no,
                    format!("invalid field path `{line}`"),
                ));
            }
            let path = FieldPath::parse(line).ok_or_else(|| {
                ConfigError::invalid(
                    line_no,
                    format!("empty path segment in `{line}` for event {}", section.event),
                )
            })?;
            if section.paths.contains(&path) {
                return Err(ConfigError::invalid(
                    line_no,
                    format!("field path `{line}` listed twice for event {}", section.event),
                ));
            }
            section.paths.push(path);
        }

        if let Some(section) = open.take() {
            Self::close(&mut config, section)?;
        }
        Ok(config)
    }

    fn close(config: &mut DiscriminatorConfig, section: OpenSection) -> Result<(), ConfigError> {
        if section.paths.is_empty() {
            return Err(ConfigError::invalid(
                section.line,
                format!("section [{}] has no field paths", section.event),
            ));
        }
        if config.paths(&section.event).is_some() {
            warn!(
                event = %section.event,
                line = section.line,
                "duplicate discriminator section replaces earlier one"
            );
        }
        config.insert(section.event, section.paths);
        Ok(())
    }
}
