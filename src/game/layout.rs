//! Plain-data layout document: tracks, trains and crossings.
//!
//! JSON is the exchange format. The same document also round-trips through
//! bincode for the compact autosave slot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::sim::train::{CarKind, EngineKind};

use super::grid::Direction;
use super::track::PieceType;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Every track cell except the second cell of each crossing.
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
    #[serde(default)]
    pub trains: Vec<TrainEntry>,
    #[serde(default)]
    pub crossings: Vec<CrossingEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEntry {
    pub row: i32,
    pub col: i32,
    pub track_type: PieceType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainEntry {
    pub row: i32,
    pub col: i32,
    pub engine_type: EngineKind,
    pub dir: Direction,
    pub enter_dir: Direction,
    #[serde(default)]
    pub cars: Vec<CarKind>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossingEntry {
    pub row: i32,
    pub col: i32,
    pub horizontal: bool,
}

fn autosave_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "railyard")
        .map(|dirs| dirs.data_dir().join("autosave.bin"))
}

impl Layout {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bincode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bincode()?)?;
        Ok(())
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        Self::from_bincode(&std::fs::read(path)?)
    }

    /// Write the snapshot slot in the platform data directory. Failures are
    /// logged, not returned.
    pub fn autosave(&self) {
        let Some(path) = autosave_path() else {
            log::warn!("Could not determine data directory");
            return;
        };
        match self.save_snapshot(&path) {
            Ok(()) => log::info!("autosaved layout to {}", path.display()),
            Err(e) => log::warn!("Failed to write autosave: {e}"),
        }
    }

    /// Read the snapshot slot, if there is a readable one.
    pub fn restore_autosave() -> Option<Self> {
        let path = autosave_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load_snapshot(&path) {
            Ok(layout) => Some(layout),
            Err(e) => {
                log::warn!("Ignoring unreadable autosave: {e}");
                None
            }
        }
    }
}
