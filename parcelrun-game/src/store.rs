//! Persisted day history.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::ScoreStore;

/// Immutable summary of one completed day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub time_taken: f32,
    pub tips_earned: u32,
}

/// On-disk layout: `{"scores": [...]}` in day order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistory {
    #[serde(default)]
    pub scores: Vec<ScoreRecord>,
}

impl ScoreHistory {
    #[must_use]
    pub fn total_tips(&self) -> u64 {
        self.scores
            .iter()
            .map(|record| u64::from(record.tips_earned))
            .sum()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("score store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("score history is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-process history, cloneable so tests can inspect what a session wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    records: Rc<RefCell<Vec<ScoreRecord>>>,
}

impl MemoryScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<ScoreRecord>) -> Self {
        Self {
            records: Rc::new(RefCell::new(records)),
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<ScoreRecord> {
        self.records.borrow().clone()
    }
}

impl ScoreStore for MemoryScoreStore {
    type Error = Infallible;

    fn save(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
        self.records.borrow_mut().push(*record);
        Ok(())
    }

    fn load_all(&self) -> Result<ScoreHistory, Self::Error> {
        Ok(ScoreHistory {
            scores: self.records.borrow().clone(),
        })
    }
}

/// History kept in a single JSON file, rewritten on every save.
#[derive(Debug, Clone)]
pub struct JsonFileScoreStore {
    path: PathBuf,
}

impl JsonFileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable history file is moved before it is replaced.
    #[must_use]
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn set_aside_corrupt(&self) {
        if let Err(err) = fs::rename(&self.path, self.corrupt_path()) {
            log::warn!("could not move corrupt history aside: {err}");
        }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ScoreStore for JsonFileScoreStore {
    type Error = StoreError;

    fn save(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
        let mut history = match self.load_all() {
            Ok(history) => history,
            Err(StoreError::Json(err)) => {
                log::warn!(
                    "score history at {} is corrupt, starting a new one: {err}",
                    self.path.display()
                );
                self.set_aside_corrupt();
                ScoreHistory::default()
            }
            Err(err) => return Err(err),
        };
        history.scores.push(*record);
        let json = serde_json::to_string_pretty(&history)?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        fs::write(&self.path, json).map_err(|err| self.io_error(err))
    }

    fn load_all(&self) -> Result<ScoreHistory, Self::Error> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(ScoreHistory::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ScoreHistory::default()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Load persisted history, degrading to an empty one when the store fails.
pub fn load_history_or_empty<S: ScoreStore>(store: &S) -> ScoreHistory {
    store.load_all().unwrap_or_else(|err| {
        log::warn!("score history unavailable, starting empty: {err}");
        ScoreHistory::default()
    })
}
