//! Durable key/value storage for dashboard state.
//! Each key maps to one JSON file in the data directory.

use std::fs;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::WeatherError;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read the value stored under `key`. A missing key is `Ok(None)`;
    /// unreadable or unparsable data is an error.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WeatherError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| WeatherError::Storage(format!("read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| WeatherError::Storage(format!("parse {}: {}", path.display(), e)))
    }

    /// Write `value` under `key`, replacing the previous file in one rename.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), WeatherError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            WeatherError::Storage(format!("create {}: {}", self.dir.display(), e))
        })?;

        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| WeatherError::Storage(format!("serialize {}: {}", key, e)))?;

        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .map_err(|e| WeatherError::Storage(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| WeatherError::Storage(format!("rename {}: {}", path.display(), e)))?;

        tracing::debug!("Stored {} at {:?}", key, path);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), WeatherError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WeatherError::Storage(format!(
                "remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
