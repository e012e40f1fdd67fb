//! Persisted program records.
//!
//! A store is a flat string map. Each program occupies three entries under
//! its key: `<key>/hash`, `<key>/program` (base64 of the zlib-compressed
//! binary) and `<key>/format` (decimal driver format).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::codec::{decode_binary, encode_binary};
use super::key::ProgramKey;
use crate::error::GlError;
use crate::gpu::ProgramBinary;

/// String key/value persistence behind the program cache.
pub trait ProgramStore: fmt::Debug {
    /// Value stored under `key`.
    fn value(&self, key: &str) -> Option<String>;
    /// Set `key` in memory. Call [`ProgramStore::sync`] to persist.
    fn set_value(&mut self, key: &str, value: String);
    /// Persist pending changes.
    ///
    /// # Errors
    ///
    /// [`GlError::Io`] or [`GlError::CacheStore`] if writing fails.
    fn sync(&mut self) -> Result<(), GlError>;
    /// All stored keys, sorted.
    fn keys(&self) -> Vec<String>;
    /// Remove every entry and persist the empty store.
    ///
    /// # Errors
    ///
    /// As [`ProgramStore::sync`].
    fn clear(&mut self) -> Result<(), GlError>;
}

/// Volatile store, for tests and for machines without a config directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgramStore for MemoryStore {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: String) {
        let _ = self.values.insert(key.to_owned(), value);
    }

    fn sync(&mut self) -> Result<(), GlError> {
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<(), GlError> {
        self.values.clear();
        Ok(())
    }
}

/// TOML settings file scoped by organization and application.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Open the settings file at `path`. A missing file is an empty store.
    /// A file that is not a flat table of strings is also opened empty, and
    /// is overwritten by the next [`ProgramStore::sync`].
    ///
    /// # Errors
    ///
    /// [`GlError::Io`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GlError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "discarding unreadable program store {}: {e}",
                    path.display()
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(GlError::io(&path, e)),
        };
        log::debug!(
            "opened program store {} ({} entries)",
            path.display(),
            values.len()
        );
        Ok(Self { path, values })
    }

    /// Open `<config dir>/<organization>/<application>.toml`.
    ///
    /// # Errors
    ///
    /// [`GlError::CacheStore`] if the platform has no config directory,
    /// otherwise as [`SettingsStore::open`].
    pub fn for_application(
        organization: &str,
        application: &str,
    ) -> Result<Self, GlError> {
        let path = Self::default_path(organization, application).ok_or_else(
            || GlError::CacheStore("no user config directory".to_owned()),
        )?;
        Self::open(path)
    }

    /// Location of the settings file for an organization/application pair.
    #[must_use]
    pub fn default_path(organization: &str, application: &str) -> Option<PathBuf> {
        let dirs = directories::BaseDirs::new()?;
        Some(
            dirs.config_dir()
                .join(organization)
                .join(format!("{application}.toml")),
        )
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file written before being renamed over the store.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgramStore for SettingsStore {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: String) {
        let _ = self.values.insert(key.to_owned(), value);
    }

    fn sync(&mut self) -> Result<(), GlError> {
        let content = toml::to_string(&self.values)
            .map_err(|e| GlError::CacheStore(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| GlError::io(parent, e))?;
        }
        // Replace the file in one step so an interrupted write never leaves
        // a truncated store behind.
        let staging = self.staging_path();
        fs::write(&staging, content).map_err(|e| GlError::io(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| GlError::io(&self.path, e))
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<(), GlError> {
        self.values.clear();
        self.sync()
    }
}

/// The three persisted strings of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgramRecord {
    /// Source hash the binary was built from.
    pub hash: String,
    /// base64(zlib(binary)).
    pub program: String,
    /// Driver binary format, decimal.
    pub format: String,
}

impl CompiledProgramRecord {
    /// Encode `binary` for storage.
    ///
    /// # Errors
    ///
    /// See [`encode_binary`].
    pub fn encode(hash: String, binary: &ProgramBinary) -> Result<Self, GlError> {
        Ok(Self {
            hash,
            program: encode_binary(&binary.bytes)?,
            format: binary.format.to_string(),
        })
    }

    /// Decode the stored binary.
    ///
    /// # Errors
    ///
    /// [`GlError::CacheStore`] if the payload or the format is corrupt.
    pub fn decode(&self) -> Result<ProgramBinary, GlError> {
        let format = self.format.trim().parse().map_err(|_| {
            GlError::CacheStore(format!("invalid binary format {:?}", self.format))
        })?;
        Ok(ProgramBinary {
            bytes: decode_binary(&self.program)?,
            format,
        })
    }

    /// Record for `key`, `None` unless all three entries are present.
    #[must_use]
    pub fn load(store: &dyn ProgramStore, key: &ProgramKey) -> Option<Self> {
        Some(Self {
            hash: store.value(&entry(key, "hash"))?,
            program: store.value(&entry(key, "program"))?,
            format: store.value(&entry(key, "format"))?,
        })
    }

    /// Write the record under `key` and flush the store.
    ///
    /// # Errors
    ///
    /// As [`ProgramStore::sync`].
    pub fn save(&self, store: &mut dyn ProgramStore, key: &ProgramKey) -> Result<(), GlError> {
        store.set_value(&entry(key, "hash"), self.hash.clone());
        store.set_value(&entry(key, "program"), self.program.clone());
        store.set_value(&entry(key, "format"), self.format.clone());
        store.sync()
    }
}

/// Program keys that have a record in `store`.
#[must_use]
pub fn stored_keys(store: &dyn ProgramStore) -> Vec<String> {
    store
        .keys()
        .iter()
        .filter_map(|k| k.strip_suffix("/hash"))
        .map(str::to_owned)
        .collect()
}

fn entry(key: &ProgramKey, field: &str) -> String {
    format!("{key}/{field}")
}
