//! # Settings Store
//!
//! Durable key-value storage for the saved printer and the receipt design.
//!
//! The store is injected into [`PrinterManager`](crate::transport::PrinterManager)
//! rather than reached through a global, so tests run against [`MemoryStore`]
//! and the CLI against [`JsonFileStore`].
//!
//! ## Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `saved_printer` | `{"savedAddress": "...", "savedName": "..."}` |
//! | `receipt_design` | [`ReceiptDesign`] as camelCase JSON |

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrintResult, PrinterError};
use crate::receipt::ReceiptDesign;

/// Key holding the saved printer
pub const SAVED_PRINTER_KEY: &str = "saved_printer";

/// Key holding the receipt design
pub const RECEIPT_DESIGN_KEY: &str = "receipt_design";

/// String key-value storage that survives restarts.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> PrintResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> PrintResult<()>;
    fn remove(&mut self, key: &str) -> PrintResult<()>;
}

/// The printer a user last chose explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPrinter {
    #[serde(rename = "savedAddress")]
    pub address: String,
    #[serde(rename = "savedName")]
    pub name: String,
}

impl SavedPrinter {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Read the saved printer; `None` when nothing was saved.
    pub fn load(store: &dyn KeyValueStore) -> PrintResult<Option<Self>> {
        match store.get(SAVED_PRINTER_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> PrintResult<()> {
        store.set(SAVED_PRINTER_KEY, &serde_json::to_string(self)?)
    }

    pub fn clear(store: &mut dyn KeyValueStore) -> PrintResult<()> {
        store.remove(SAVED_PRINTER_KEY)
    }
}

/// Read the receipt design, falling back to the defaults.
pub fn load_design(store: &dyn KeyValueStore) -> PrintResult<ReceiptDesign> {
    match store.get(RECEIPT_DESIGN_KEY)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(ReceiptDesign::default()),
    }
}

pub fn save_design(store: &mut dyn KeyValueStore, design: &ReceiptDesign) -> PrintResult<()> {
    store.set(RECEIPT_DESIGN_KEY, &serde_json::to_string(design)?)
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Volatile store for tests and one-shot tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PrintResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PrintResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PrintResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

// ============================================================================
// JSON FILE STORE
// ============================================================================

/// Store backed by a single JSON object on disk.
///
/// The whole file is read once on open and rewritten after every mutation.
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, treating a missing file as an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> PrintResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                PrinterError::Store(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PrinterError::Store(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> PrintResult<()> {
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                PrinterError::Store(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> PrintResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PrintResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> PrintResult<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
