use crate::error::{Error, Result};
use crate::key::ResourceKey;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const FIRST_VALUE: i32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    next_value: i32,
    #[serde(default)]
    data: BTreeMap<String, i32>,
}

/// Persistent custom-model-data allocator. Values outlive the pack, since
/// items carry them, so a model keeps its value across runs.
#[derive(Debug)]
pub struct IdentifierStore {
    path: PathBuf,
    allocated: HashMap<ResourceKey, i32>,
    next_value: i32,
}

impl IdentifierStore {
    /// Load the store at `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            allocated: HashMap::new(),
            next_value: FIRST_VALUE,
        };
        if !store.path.is_file() {
            debug!(
                "No identifier store at '{}', starting empty.",
                store.path.display()
            );
            return Ok(store);
        }

        let text = fs::read_to_string(&store.path).map_err(|e| Error::io(&store.path, e))?;
        let file: StoreFile = serde_json::from_str(&text)
            .map_err(|e| Error::malformed(store.path.display().to_string(), e.to_string()))?;
        store.next_value = file.next_value.max(FIRST_VALUE);
        for (raw, value) in file.data {
            let key: ResourceKey = raw.parse()?;
            store.allocated.insert(key, value);
        }

        // A hand-edited file may hold values the counter never handed out.
        if let Some(&max) = store.allocated.values().max()
            && max >= store.next_value
        {
            warn!(
                "Identifier store '{}' has value {max} at or above its counter {}; advancing counter.",
                store.path.display(),
                store.next_value
            );
            store.next_value = max + 1;
        }

        info!(
            "Loaded identifier store '{}' ({} entries, next value {}).",
            store.path.display(),
            store.allocated.len(),
            store.next_value
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has(&self, key: &ResourceKey) -> bool {
        self.allocated.contains_key(key)
    }

    pub fn get(&self, key: &ResourceKey) -> Result<i32> {
        self.allocated
            .get(key)
            .copied()
            .ok_or_else(|| Error::not_found(format!("identifier for {key}")))
    }

    /// Associate `value` with `key`. Setting the value a key already holds is a no-op.
    ///
    /// Does not check whether another key already uses `value`.
    pub fn set(&mut self, key: &ResourceKey, value: i32) {
        if self.allocated.get(key) == Some(&value) {
            return;
        }
        self.allocated.insert(key.clone(), value);
        if value >= self.next_value {
            // Keep every recorded value below the counter.
            self.next_value = value + 1;
        }
    }

    /// Hand out the current counter and advance it. Nothing is recorded.
    pub fn next(&mut self) -> i32 {
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    pub fn peek_next(&self) -> i32 {
        self.next_value
    }

    pub fn len(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, i32)> {
        self.allocated.iter().map(|(k, &v)| (k, v))
    }

    /// Overwrite the backing file with the full current state.
    pub fn save(&self) -> Result<()> {
        let file = StoreFile {
            next_value: self.next_value,
            data: self
                .allocated
                .iter()
                .map(|(k, &v)| (k.to_string(), v))
                .collect(),
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, text).map_err(|e| Error::io(&self.path, e))?;
        debug!(
            "Saved identifier store '{}' ({} entries).",
            self.path.display(),
            self.allocated.len()
        );
        Ok(())
    }
}
