//! Append-only persistence of metric series.
//!
//! Appending never overwrites history: each flushed series is concatenated
//! onto what is already stored under the same key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BboError, Result};

use super::results::{ResultsSnapshot, Series};

/// Storage for flushed results.
pub trait MetricsRecorder {
    /// Concatenate every series in `snapshot` onto the stored series.
    fn append(&mut self, snapshot: &ResultsSnapshot) -> Result<()>;

    /// Read back the full stored series for `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Series>>;
}

/// One `<key>.json` file per metric under a directory.
#[derive(Debug, Clone)]
pub struct JsonSeriesRecorder {
    dir: PathBuf,
}

impl JsonSeriesRecorder {
    /// Creates the directory if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read(&self, key: &str) -> Result<Option<Series>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| BboError::CorruptMetrics {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl MetricsRecorder for JsonSeriesRecorder {
    fn append(&mut self, snapshot: &ResultsSnapshot) -> Result<()> {
        for (key, series) in snapshot.iter() {
            if series.is_empty() {
                continue;
            }
            let merged = match self.read(key)? {
                Some(mut stored) => {
                    stored.append(key, series)?;
                    stored
                }
                None => series.clone(),
            };
            fs::write(self.path(key), serde_json::to_vec(&merged)?)?;
        }
        log::debug!(
            "Appended {} metric series to {}",
            snapshot.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Series>> {
        self.read(key)
    }
}

/// In-memory recorder.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    series: BTreeMap<String, Series>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsRecorder for MemoryRecorder {
    fn append(&mut self, snapshot: &ResultsSnapshot) -> Result<()> {
        for (key, series) in snapshot.iter() {
            match self.series.get_mut(key) {
                Some(stored) => stored.append(key, series)?,
                None => {
                    self.series.insert(key.clone(), series.clone());
                }
            }
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Series>> {
        Ok(self.series.get(key).cloned())
    }
}

impl<R: MetricsRecorder + ?Sized> MetricsRecorder for Box<R> {
    fn append(&mut self, snapshot: &ResultsSnapshot) -> Result<()> {
        (**self).append(snapshot)
    }

    fn load(&self, key: &str) -> Result<Option<Series>> {
        (**self).load(key)
    }
}
