//! Literal JSON values and discriminator keys.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value};

/// A literal JSON value, extended with an "absent" sentinel.
///
/// `Absent` marks a discriminator path that did not resolve in a sample and is
/// distinct from an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Literal>),
    Object(BTreeMap<String, Literal>),
}

impl Literal {
    /// Convert back to a JSON value.
    ///
    /// `Absent` has no JSON form: at the top level it yields `None`, inside
    /// an array it becomes `null` and inside an object the key is dropped.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Literal::Absent => None,
            Literal::Null => Some(Value::Null),
            Literal::Bool(b) => Some(Value::Bool(*b)),
            Literal::Number(n) => Some(Value::Number(n.clone())),
            Literal::String(s) => Some(Value::String(s.clone())),
            Literal::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.to_value().unwrap_or(Value::Null))
                    .collect(),
            )),
            Literal::Object(fields) => {
                let mut map = Map::new();
                for (key, literal) in fields {
                    if let Some(value) = literal.to_value() {
                        map.insert(key.clone(), value);
                    }
                }
                Some(Value::Object(map))
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Literal::Absent)
    }
}

impl From<&Value> for Literal {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => Literal::Number(n.clone()),
            Value::String(s) => Literal::String(s.clone()),
            Value::Array(items) => Literal::Array(items.iter().map(Literal::from).collect()),
            Value::Object(map) => Literal::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Literal::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Literal::from(&value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "<absent>"),
        }
    }
}

/// The literal values found at each configured discriminator path of one
/// sample, keyed by the dotted path string.
///
/// Equality ignores entry order: two keys are equal when they hold the same
/// paths with structurally equal values.
#[derive(Debug, Clone, Default)]
pub struct DiscriminatorKey {
    entries: Vec<(String, Literal)>,
}

impl DiscriminatorKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path/value pair.
    pub fn push(&mut self, path: impl Into<String>, value: Literal) {
        self.entries.push((path.into(), value));
    }

    /// Value extracted for `path`, if the key carries that path.
    pub fn get(&self, path: &str) -> Option<&Literal> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, literal)| literal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.entries.iter().map(|(p, l)| (p.as_str(), l))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object form of the key; absent values are left out.
    pub fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|(path, literal)| literal.to_value().map(|v| (path.clone(), v)))
            .collect()
    }
}

impl PartialEq for DiscriminatorKey {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(path, literal)| other.get(path) == Some(literal))
    }
}

impl Eq for DiscriminatorKey {}

impl FromIterator<(String, Literal)> for DiscriminatorKey {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for DiscriminatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (path, literal)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", path, literal)?;
        }
        write!(f, "}}")
    }
}
