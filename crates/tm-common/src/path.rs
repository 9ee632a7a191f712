//! Dotted field paths used by discriminator configuration.

use serde_json::Value;
use std::fmt;

use crate::literal::Literal;

/// A path of field names into a JSON object, e.g. `user.id`.
///
/// Always holds at least one segment and never an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path. Returns `None` for empty segments.
    pub fn parse(s: &str) -> Option<Self> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        Self::from_segments(segments)
    }

    /// Build from explicit segments. Returns `None` if there are no segments
    /// or any segment is empty.
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            None
        } else {
            Some(FieldPath(segments))
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Walk `value` along this path.
    ///
    /// Yields [`Literal::Absent`] if a segment is missing or an intermediate
    /// value is not an object.
    pub fn resolve(&self, value: &Value) -> Literal {
        let mut current = value;
        for segment in &self.0 {
            match current {
                Value::Object(map) => match map.get(segment) {
                    Some(next) => current = next,
                    None => return Literal::Absent,
                },
                _ => return Literal::Absent,
            }
        }
        Literal::from(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
