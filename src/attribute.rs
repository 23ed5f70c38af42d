//! Mapping of directory attributes into caller-facing attributes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use ldap3::SearchEntry;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Normalized attributes handed to the caller.
pub type Attributes = BTreeMap<String, Value>;

/// Function applied to every raw value before type conversion.
pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Target type of a mapped attribute.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// First value as a string.
    #[default]
    String,
    /// Every value, as a list of strings.
    Array,
    /// First value as a signed integer.
    Int,
    /// First value as a boolean.
    Bool,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Array => "array",
            Self::Int => "int",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// One backend attribute exposed under a caller-facing name.
#[derive(Clone)]
pub struct AttributeMapEntry {
    name: String,
    attr: String,
    kind: AttributeType,
    transform: Option<Transform>,
}

impl AttributeMapEntry {
    /// Create a new [`AttributeMapEntry`] of type [`AttributeType::String`].
    pub fn new(name: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr: attr.into(),
            kind: AttributeType::default(),
            transform: None,
        }
    }

    /// Update the target type.
    pub fn kind(mut self, kind: AttributeType) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a transform run on each raw value.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Caller-facing name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend attribute name.
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Target type.
    pub fn attribute_type(&self) -> AttributeType {
        self.kind
    }

    fn convert(&self, values: &[String]) -> Result<Value> {
        let values: Vec<String> = match &self.transform {
            Some(transform) => {
                values.iter().map(|v| transform(v.as_str())).collect()
            },
            None => values.to_vec(),
        };

        let invalid = || Error::AttributeConversion {
            attribute: self.attr.clone(),
            kind: self.kind,
        };
        let first = values.first().ok_or_else(invalid)?;

        let value = match self.kind {
            AttributeType::String => Value::String(first.clone()),
            AttributeType::Array => {
                Value::Array(values.into_iter().map(Value::String).collect())
            },
            AttributeType::Int => first
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid())?,
            AttributeType::Bool => match first.trim() {
                "TRUE" | "true" | "1" => Value::Bool(true),
                "FALSE" | "false" | "0" => Value::Bool(false),
                _ => return Err(invalid()),
            },
        };

        Ok(value)
    }
}

impl fmt::Debug for AttributeMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeMapEntry")
            .field("name", &self.name)
            .field("attr", &self.attr)
            .field("kind", &self.kind)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeSpec {
    attr: String,
    #[serde(default, rename = "type")]
    kind: AttributeType,
}

/// Ordered set of [`AttributeMapEntry`].
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    entries: Vec<AttributeMapEntry>,
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let specs =
            BTreeMap::<String, AttributeSpec>::deserialize(deserializer)?;

        Ok(specs
            .into_iter()
            .map(|(name, spec)| {
                AttributeMapEntry::new(name, spec.attr).kind(spec.kind)
            })
            .collect())
    }
}

impl FromIterator<AttributeMapEntry> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = AttributeMapEntry>>(iter: I) -> Self {
        let mut map = Self::default();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

impl AttributeMap {
    /// Add an entry, replacing any entry with the same caller-facing name.
    pub fn insert(&mut self, entry: AttributeMapEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Chainable [`AttributeMap::insert`].
    pub fn with(mut self, entry: AttributeMapEntry) -> Self {
        self.insert(entry);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeMapEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backend attribute names to request, without duplicates.
    pub fn backend_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&entry.attr)) {
                names.push(&entry.attr);
            }
        }
        names
    }

    /// Convert a raw directory entry into caller-facing [`Attributes`].
    ///
    /// Backend attributes missing from the entry are skipped.
    pub fn map(&self, entry: &SearchEntry) -> Result<Attributes> {
        let mut attributes = Attributes::new();

        for mapping in &self.entries {
            match values(&entry.attrs, &mapping.attr) {
                Some(raw) => {
                    attributes.insert(
                        mapping.name.clone(),
                        mapping.convert(raw)?,
                    );
                },
                None => tracing::warn!(
                    dn = %entry.dn,
                    attr = %mapping.attr,
                    "found no value for mapped attribute"
                ),
            }
        }

        Ok(attributes)
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = &'a AttributeMapEntry;
    type IntoIter = std::slice::Iter<'a, AttributeMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Values of attribute `name`, compared case-insensitively as LDAP does.
pub(crate) fn values<'a>(
    attrs: &'a HashMap<String, Vec<String>>,
    name: &str,
) -> Option<&'a [String]> {
    attrs
        .get(name)
        .or_else(|| {
            attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
        .map(Vec::as_slice)
        .filter(|v| !v.is_empty())
}
