use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::keys::StorageKey;
use super::{FetchError, KeyLookup};

/// Immutable dump of a contract's key/value storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageSnapshot {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl StorageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the gateway's `hex key → hex value` pairs.
    pub fn from_hex_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, FetchError> {
        let mut entries = BTreeMap::new();
        for (k, v) in pairs {
            let key = hex::decode(k).map_err(|source| FetchError::Hex {
                what: "storage key".into(),
                source,
            })?;
            let value = hex::decode(v).map_err(|source| FetchError::Hex {
                what: format!("value of key {k}"),
                source,
            })?;
            entries.insert(key, value);
        }
        Ok(StorageSnapshot { entries })
    }

    pub fn insert(&mut self, key: StorageKey, value: Vec<u8>) {
        self.entries.insert(key.as_bytes().to_vec(), value);
    }

    pub fn get(&self, key: &StorageKey) -> KeyLookup {
        match self.entries.get(key.as_bytes()) {
            Some(v) => KeyLookup::Found(v.clone()),
            None => KeyLookup::NotFound,
        }
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn scan<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_hex_pairs(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect()
    }
}

/// Every byte string one reconciliation pass reads: the storage dump plus
/// the view-query results, keyed by function name.
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub storage: StorageSnapshot,
    pub views: BTreeMap<String, Vec<Vec<u8>>>,
}

impl RawState {
    /// First return value of a view, or an error if it was never fetched.
    /// A view that returned nothing reads as an empty value.
    pub fn view(&self, function: &str) -> Result<&[u8], FetchError> {
        let results = self
            .views
            .get(function)
            .ok_or_else(|| FetchError::MissingView(function.to_string()))?;
        Ok(results.first().map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = SnapshotFile {
            saved_at: saved_at(),
            pairs: self.storage.to_hex_pairs(),
            views: self
                .views
                .iter()
                .map(|(name, results)| (name.clone(), results.iter().map(hex::encode).collect()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json).context("writing snapshot file")?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let file: SnapshotFile = serde_json::from_str(&contents).context("parsing snapshot file")?;

        let storage = StorageSnapshot::from_hex_pairs(&file.pairs)?;
        let mut views = BTreeMap::new();
        for (name, results) in file.views {
            let decoded = results
                .iter()
                .map(hex::decode)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("decoding results of view `{name}`"))?;
            views.insert(name, decoded);
        }
        Ok(RawState { storage, views })
    }
}

/// On-disk snapshot layout (hex everywhere, gateway-compatible `pairs`).
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
    pairs: BTreeMap<String, String>,
    #[serde(default)]
    views: BTreeMap<String, Vec<String>>,
}

#[cfg(feature = "full")]
fn saved_at() -> Option<String> {
    Some(chrono::Utc::now().to_rfc3339())
}

#[cfg(not(feature = "full"))]
fn saved_at() -> Option<String> {
    None
}
