use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

const TASKS_FILE: &str = "tasks.json";

/// Durable storage boundary for the task collection.
///
/// Implementations hold the entire collection under a single slot: `load`
/// reads it once at startup and `save` overwrites it completely after each
/// mutation. There are no partial updates.
pub trait Backend {
    fn load(&self) -> Result<Vec<Task>, LoadError>;
    fn save(&self, tasks: &[Task]) -> Result<(), SaveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed task data in {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize task collection")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to persist {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// File-backed [`Backend`] storing one JSON array of task records.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join(TASKS_FILE);
        info!(file = %path.display(), "opened task backend");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for JsonFileBackend {
    #[tracing::instrument(skip(self))]
    fn load(&self) -> Result<Vec<Task>, LoadError> {
        if !self.path.exists() {
            debug!(file = %self.path.display(), "no stored tasks yet");
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }

        let tasks: Vec<Task> =
            serde_json::from_str(&raw).map_err(|source| LoadError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        debug!(count = tasks.len(), "loaded stored tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks))]
    fn save(&self, tasks: &[Task]) -> Result<(), SaveError> {
        debug!(file = %self.path.display(), count = tasks.len(), "saving tasks atomically");

        let io_err = |source| SaveError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;

        let serialized =
            serde_json::to_string_pretty(tasks).map_err(SaveError::Serialize)?;
        temp.write_all(serialized.as_bytes()).map_err(io_err)?;
        temp.flush().map_err(io_err)?;

        temp.persist(&self.path)
            .map_err(|source| SaveError::Persist {
                path: self.path.clone(),
                source,
            })?;

        Ok(())
    }
}
