use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sim::train::EngineKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RailwayConfig {
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub train: TrainConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Upper bound on a single tick's dt, in seconds.
    pub max_frame_dt: f64,
    /// Seconds a vacated crossing stays active.
    pub crossing_grace: f64,
    /// Seconds between crossing light flips.
    pub blink_interval: f64,
    /// Cells a follower may step back from its leader before clamping.
    pub max_backsteps: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Along-track gap between the engine and the first car, in cells.
    pub first_car_spacing: f64,
    /// Gap between consecutive cars, in cells.
    pub car_spacing: f64,
    /// Cells per second.
    pub steam_speed: f64,
    pub diesel_speed: f64,
    pub electric_speed: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World units per grid cell.
    pub cell_size: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log each frame's dt at debug level.
    #[serde(default)]
    pub log_ticks: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.1,
            crossing_grace: 1.0,
            blink_interval: 0.5,
            max_backsteps: 16,
        }
    }
}

impl SimConfig {
    /// Replace a frame cap that isn't a positive number with the default.
    fn sanitize(&mut self) {
        if !(self.max_frame_dt > 0.0) {
            log::warn!("Invalid sim.max_frame_dt {}. Using default.", self.max_frame_dt);
            self.max_frame_dt = Self::default().max_frame_dt;
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            first_car_spacing: 0.75,
            car_spacing: 0.6,
            steam_speed: 1.0,
            diesel_speed: 1.2,
            electric_speed: 1.5,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { cell_size: 2.0 }
    }
}

impl TrainConfig {
    pub fn speed_for(&self, kind: EngineKind) -> f64 {
        match kind {
            EngineKind::Steam => self.steam_speed,
            EngineKind::Diesel => self.diesel_speed,
            EngineKind::Electric => self.electric_speed,
        }
    }

    /// Spacing behind the leader for the segment at `index` (1 = first car).
    pub fn spacing_for(&self, index: usize) -> f64 {
        if index <= 1 {
            self.first_car_spacing
        } else {
            self.car_spacing
        }
    }
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "railyard")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
}

impl RailwayConfig {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Read settings from `path`. A missing file is created with defaults;
    /// an unreadable one falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut config) => {
                    config.sim.sanitize();
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {e}. Using defaults.");
                    Self::default()
                }
            },
            Err(_) => {
                let config = Self::default();
                config.save_to(path);
                config
            }
        }
    }

    pub fn save(&self) {
        let Some(path) = config_path() else {
            log::warn!("Could not determine config directory");
            return;
        };
        self.save_to(&path);
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {e}");
                return;
            }
        }

        match toml::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(path, contents) {
                    log::warn!("Failed to write config: {e}");
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize config: {e}");
            }
        }
    }
}
