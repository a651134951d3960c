//! Durable key-value store.
//!
//! Values live in `~/.local/share/shapes-auth/storage.json` as a flat JSON
//! object and survive restarts. A file that is not a JSON object makes reads
//! fail, but the next write or removal replaces it.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::TokenStore;
use crate::error::AuthResult;

/// JSON-file backed key-value store.
#[derive(Debug, Clone)]
pub struct DurableStore {
    path: PathBuf,
}

impl DurableStore {
    /// Create a store backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the default storage path.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir =
            dirs::data_local_dir().context("Could not determine local data directory")?;
        Ok(data_dir.join("shapes-auth").join("storage.json"))
    }

    fn read_contents(&self) -> AuthResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    /// Current values for a rewrite. Unparseable contents are dropped.
    fn read_for_update(&self) -> AuthResult<BTreeMap<String, Value>> {
        let Some(contents) = self.read_contents()? else {
            return Ok(BTreeMap::new());
        };
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "replacing unreadable durable store"
            );
            BTreeMap::new()
        }))
    }

    fn write_all<T: Serialize>(&self, values: &T) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;

        // Owner read/write only; the file holds a raw bearer token.
        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms)?;
        }

        serde_json::to_writer_pretty(BufWriter::new(file), values)?;
        Ok(())
    }
}

impl TokenStore for DurableStore {
    /// Non-string values count as absent.
    fn get(&self, name: &str) -> AuthResult<Option<String>> {
        let Some(contents) = self.read_contents()? else {
            return Ok(None);
        };
        let mut values: BTreeMap<String, Value> = serde_json::from_str(&contents)?;
        Ok(match values.remove(name) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        })
    }

    fn set(&mut self, name: &str, value: &str) -> AuthResult<()> {
        let mut values = self.read_for_update()?;
        values.insert(name.to_string(), Value::String(value.to_string()));
        self.write_all(&values)
    }

    fn remove(&mut self, name: &str) -> AuthResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut values = self.read_for_update()?;
        values.remove(name);
        self.write_all(&values)
    }
}
