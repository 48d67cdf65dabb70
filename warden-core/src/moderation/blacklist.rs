//! Static blacklist of addresses.

use std::collections::HashSet;
use std::path::Path;

use crate::error::BlacklistError;

/// Immutable set of lower-cased addresses.
///
/// Built once at startup and shared behind an `Arc`. There is no way to
/// mutate the set after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlacklistSet {
    addresses: HashSet<String>,
}

impl BlacklistSet {
    /// Build a set from any iterator of addresses. Entries are lower-cased.
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_ascii_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// Parse a JSON array of address strings.
    pub fn from_json(json: &str) -> Result<Self, BlacklistError> {
        let entries: Vec<String> =
            serde_json::from_str(json).map_err(|e| BlacklistError::Parse(e.to_string()))?;
        Ok(Self::from_addresses(entries))
    }

    /// Load a JSON array of address strings from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlacklistError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BlacklistError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the set holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(&address.to_ascii_lowercase())
    }
}
