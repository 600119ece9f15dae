//! Alias table. Maps ordering-platform display names onto ledger member names.
//!
//! The document is a mapping of canonical name to known variants:
//!
//! ```yaml
//! Jane Doe:
//!   - J. Doe
//!   - Jane D
//! ```
//!
//! JSON is accepted too (it parses as YAML). Document order is preserved so
//! that an ambiguous variant always resolves to the first canonical name
//! listing it.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Ordered canonical-name → variants table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(String, Vec<String>)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a canonical name with its variants.
    pub fn with(mut self, canonical: impl Into<String>, aliases: &[&str]) -> Self {
        self.entries.push((
            canonical.into(),
            aliases.iter().map(|a| (*a).to_owned()).collect(),
        ));
        self
    }

    /// Load the table at `path`. A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no alias table found, using identity mapping");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::AliasRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::AliasParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Canonical name for `display_name`; the name itself when no entry lists it.
    pub fn resolve<'a>(&'a self, display_name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == display_name))
            .map(|(canonical, _)| canonical.as_str())
            .unwrap_or(display_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for AliasTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedEntries;

        impl<'de> Visitor<'de> for OrderedEntries {
            type Value = AliasTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of canonical names to lists of aliases")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((canonical, aliases)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((canonical, aliases));
                }
                Ok(AliasTable { entries })
            }
        }

        deserializer.deserialize_map(OrderedEntries)
    }
}
