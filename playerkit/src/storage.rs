//! File-backed storage
//!
//! One JSON file per key in a directory, by default
//! `<platform data dir>/playerkit`. Writes go to a temporary file first and
//! are renamed into place, so a crash mid-write leaves the previous record
//! intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use player_state::{Storage, StorageError};
use tracing::debug;

/// Directory under the platform data dir used by [`FileStorage::in_data_dir`]
pub const DATA_DIR_NAME: &str = "playerkit";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store files in `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store files in the platform data directory
    ///
    /// Fails with [`StorageError::Unavailable`] on platforms without one.
    pub fn in_data_dir() -> Result<Self, StorageError> {
        let base = dirs::data_dir().ok_or(StorageError::Unavailable)?;
        Ok(Self::new(base.join(DATA_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    ///
    /// Bytes outside `[A-Za-z0-9.-]` (and a leading `.`) are written as `_XX`
    /// hex escapes, so a key can never escape the directory and distinct keys
    /// never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for (i, byte) in key.bytes().enumerate() {
            let plain = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
            if plain {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("_{byte:02X}"));
            }
        }
        if name.is_empty() {
            name.push('_');
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote storage file");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
