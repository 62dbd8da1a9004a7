//! Persistent lookup context.
//!
//! A flat JSON object mapping context keys to previously resolved values. The
//! file is meant to be committed next to the stack definition so synthesis
//! does not depend on live cloud calls.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Default context file name, relative to the working directory
pub const DEFAULT_CONTEXT_FILE: &str = "cdk.context.json";

/// Key/value store backed by a JSON file
#[derive(Debug, Clone)]
pub struct ContextCache {
    path: PathBuf,
    entries: BTreeMap<String, JsonValue>,
    dirty: bool,
}

impl ContextCache {
    /// Load the cache from `path`. A missing file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::context_file(&path, format!("failed to read: {}", e)))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| Error::context_file(&path, format!("invalid JSON: {}", e)))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Loaded context cache");

        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get and deserialize a value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    Error::context_file(&self.path, format!("entry '{}' is malformed: {}", key, e))
                }),
            None => Ok(None),
        }
    }

    /// Store a value
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.entries
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.dirty = true;
        Ok(())
    }

    /// Remove a value, returning whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    /// Remove every value
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache back if it changed.
    ///
    /// The file is replaced atomically through a temp file in the same directory.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::context_file(&self.path, format!("failed to create directory: {}", e)))?;

        let mut content = serde_json::to_string_pretty(&self.entries)?;
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| Error::context_file(&self.path, format!("failed to write: {}", e)))?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path)
            .map_err(|e| Error::context_file(&self.path, format!("failed to write: {}", e)))?;

        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "Saved context cache");
        Ok(())
    }
}
