//! Persistence of the time state at restart boundaries.

use crate::error::CheckpointError;
use crate::solvers::RkScheme;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Time state needed to resume a run at a step boundary.
///
/// Stability thresholds are not stored; they are recomputed from the restored
/// grid and viscosities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeCheckpoint {
    pub time: f64,
    pub itime: u64,
    pub iteration: u64,
    pub scheme: RkScheme,
}

pub trait CheckpointStore {
    fn write(&self, index: u64, record: &TimeCheckpoint) -> Result<(), CheckpointError>;
    fn read(&self, index: u64) -> Result<TimeCheckpoint, CheckpointError>;
}

/// Stores one JSON file `time.<index>` per checkpoint in a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("time.{index:07}"))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn write(&self, index: u64, record: &TimeCheckpoint) -> Result<(), CheckpointError> {
        let path = self.path(index);
        let tmp = self.dir.join(format!("time.{index:07}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, index: u64) -> Result<TimeCheckpoint, CheckpointError> {
        let text = fs::read_to_string(self.path(index))?;
        Ok(serde_json::from_str(&text)?)
    }
}
