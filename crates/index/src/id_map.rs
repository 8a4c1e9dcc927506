use std::fs;
use std::path::Path;

use hashbrown::HashMap;

use crate::IndexError;

/// Mapping from internal vector id to keyframe storage path.
///
/// The on-disk form is a JSON object with stringified integer keys, e.g.
/// `{"0": "L01_V001/000123.jpg"}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdPathMap {
    paths: HashMap<i64, String>,
}

impl IdPathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON form. Keys that are not integers are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, IndexError> {
        let raw: std::collections::HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| IndexError::IdMap(e.to_string()))?;

        let mut paths = HashMap::with_capacity(raw.len());
        for (key, path) in raw {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| IndexError::IdMap(format!("key {key:?} is not an integer id")))?;
            paths.insert(id, path);
        }
        Ok(Self { paths })
    }

    /// Read and parse the JSON form from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, id: i64, path: impl Into<String>) -> Option<String> {
        self.paths.insert(id, path.into())
    }

    /// Storage path for `id`, if mapped.
    pub fn path(&self, id: i64) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<(i64, String)> for IdPathMap {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}
