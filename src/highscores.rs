//! High score persistence
//!
//! The game keeps exactly one persisted value: the best score ever reached.
//! Hosts plug in whichever slot suits them; the core only calls `load`/`save`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

/// A failure to read or write the high score slot
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Format(serde_json::Error),
    UnsupportedVersion { found: u32 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "high score i/o failed: {err}"),
            Self::Format(err) => write!(f, "high score file is malformed: {err}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported high score format version: {found}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::UnsupportedVersion { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err)
    }
}

/// A key-value slot holding one integer
pub trait HighScoreStore {
    /// Stored high score, 0 when nothing has been saved yet
    fn load(&self) -> Result<u64, StoreError>;
    fn save(&mut self, high_score: u64) -> Result<(), StoreError>;
}

/// In-process slot (tests, hosts without storage)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: u64,
    /// Number of successful saves, handy for asserting persistence happened
    pub saves: u32,
}

impl MemoryStore {
    pub fn new(value: u64) -> Self {
        Self { value, saves: 0 }
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&self) -> Result<u64, StoreError> {
        Ok(self.value)
    }

    fn save(&mut self, high_score: u64) -> Result<(), StoreError> {
        self.value = high_score;
        self.saves += 1;
        Ok(())
    }
}

/// Versioned JSON envelope written to disk
#[derive(Debug, Serialize, Deserialize)]
struct HighScoreRecord {
    version: u32,
    high_score: u64,
}

/// JSON file slot
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the slot file used while writing: `<file name>.tmp`
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HighScoreStore for FileStore {
    fn load(&self) -> Result<u64, StoreError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No high score found, starting fresh");
                return Ok(0);
            }
            Err(err) => return Err(err.into()),
        };

        let record: HighScoreRecord = serde_json::from_str(&json)?;
        if record.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: record.version,
            });
        }
        log::info!("Loaded high score {}", record.high_score);
        Ok(record.high_score)
    }

    fn save(&mut self, high_score: u64) -> Result<(), StoreError> {
        let record = HighScoreRecord {
            version: FORMAT_VERSION,
            high_score,
        };
        let json = serde_json::to_string(&record)?;

        // Write-then-rename: the slot is never observed half-written
        let tmp = self.temp_path();
        let written = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        log::info!("High score saved ({})", high_score);
        Ok(())
    }
}
