//! File-backed hi-score persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aquarium_core::HiscoreStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct HiscoreRecord {
    hiscore: f32,
}

/// Keeps the hi-score in a small JSON document (`{"hiscore": 12.5}`).
///
/// A missing or unreadable file counts as no record.
#[derive(Debug, Clone)]
pub struct JsonHiscoreFile {
    path: PathBuf,
    best: Option<f32>,
}

impl JsonHiscoreFile {
    /// Open `path`, reading any existing record.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let best = match read_record(&path) {
            Ok(record) => record.map(|r| r.hiscore),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable hi-score file");
                None
            }
        };
        Self { path, best }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best score seen by this store.
    #[must_use]
    pub fn best(&self) -> Option<f32> {
        self.best
    }

    fn write(&self, hiscore: f32) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&HiscoreRecord { hiscore })?;
        fs::write(&self.path, json)
    }
}

fn read_record(path: &Path) -> io::Result<Option<HiscoreRecord>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let record: HiscoreRecord = serde_json::from_str(&raw)?;
    Ok(Some(record).filter(|r| r.hiscore.is_finite()))
}

impl HiscoreStore for JsonHiscoreFile {
    fn load(&self) -> Option<f32> {
        self.best
    }

    fn record(&mut self, hiscore: f32) {
        if !hiscore.is_finite() || self.best.is_some_and(|best| best >= hiscore) {
            return;
        }
        match self.write(hiscore) {
            Ok(()) => {
                info!(hiscore, path = %self.path.display(), "new hi-score recorded");
                self.best = Some(hiscore);
            }
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to write hi-score"),
        }
    }
}
