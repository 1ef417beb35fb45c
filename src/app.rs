use crate::error::Result;
use crate::game::config::RailwayConfig;
use crate::game::grid::{CrossingId, CrossingRole, Grid, TrackCell};
use crate::game::layout::{CrossingEntry, Layout, TrackEntry, TrainEntry};
use crate::game::placement::{Placer, Tool};
use crate::sim::crossing::{CrossingTransition, Crossings};
use crate::sim::motion::{self, MotionEvent};
use crate::sim::train::{TrackPos, TrainId, Trains};

/// Things external audio, particle and UI code reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RailEvent {
    Placed { row: i32, col: i32 },
    Removed { row: i32, col: i32 },
    TrainPlaced(TrainId),
    TrainRemoved(TrainId),
    TrainStopped(TrainId),
    CrossingActivated(CrossingId),
    CrossingDeactivated(CrossingId),
}

/// The whole simulation: board, trains, crossings and the play flag.
/// Created once per session and reset when a layout is loaded.
pub struct Railway {
    grid: Grid,
    trains: Trains,
    crossings: Crossings,
    config: RailwayConfig,
    playing: bool,
    events: Vec<RailEvent>,
}

impl Railway {
    pub fn new(config: RailwayConfig) -> Self {
        Self {
            grid: Grid::new(),
            trains: Trains::new(),
            crossings: Crossings::new(),
            config,
            playing: false,
            events: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn trains(&self) -> &Trains {
        &self.trains
    }

    pub fn crossings(&self) -> &Crossings {
        &self.crossings
    }

    pub fn config(&self) -> &RailwayConfig {
        &self.config
    }

    fn placer(&mut self) -> Placer<'_> {
        Placer {
            grid: &mut self.grid,
            trains: &mut self.trains,
            crossings: &mut self.crossings,
            config: &self.config,
            events: &mut self.events,
        }
    }

    /// Apply a tool at a grid cell. Returns `true` if the layout changed.
    pub fn apply_tool(&mut self, tool: Tool, row: i32, col: i32) -> bool {
        self.placer().apply(tool, row, col)
    }

    /// Apply a tool named by its identifier string.
    pub fn apply_tool_str(&mut self, tool: &str, row: i32, col: i32) -> Result<bool> {
        Ok(self.apply_tool(tool.parse()?, row, col))
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            log::info!("simulation {}", if playing { "playing" } else { "paused" });
        }
        self.playing = playing;
    }

    pub fn toggle_playing(&mut self) {
        self.set_playing(!self.playing);
    }

    /// Advance the simulation by one frame. Does nothing while paused.
    pub fn tick(&mut self, dt: f64) {
        if !self.playing {
            return;
        }
        let dt = dt.min(self.config.sim.max_frame_dt).max(0.0);

        for (id, event) in motion::step_trains(&mut self.trains, &self.grid, dt, &self.config) {
            match event {
                MotionEvent::Stopped => {
                    if let Some(train) = self.trains.get(id) {
                        let (row, col) = train.engine().pos.cell();
                        log::info!("train {id:?} stopped at ({row}, {col})");
                    }
                    self.events.push(RailEvent::TrainStopped(id));
                }
            }
        }

        for (id, transition) in self.crossings.tick(&self.trains, dt, &self.config.sim) {
            match transition {
                CrossingTransition::Activated => {
                    log::info!("crossing {id:?} closed");
                    self.events.push(RailEvent::CrossingActivated(id));
                }
                CrossingTransition::Deactivated => {
                    log::info!("crossing {id:?} opened");
                    self.events.push(RailEvent::CrossingDeactivated(id));
                }
            }
        }
    }

    /// Recompute every car position and world pose from the engines.
    pub fn recompute_poses(&mut self) {
        motion::refresh_all(&mut self.trains, &self.grid, &self.config);
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<RailEvent> {
        std::mem::take(&mut self.events)
    }

    /// Remove every track, train and crossing.
    pub fn reset(&mut self) {
        self.grid.clear_all();
        self.trains.clear();
        self.crossings.clear();
        self.events.clear();
    }

    /// Replace the current layout with `layout`. Entries that don't fit the
    /// board or have no track under them are skipped.
    pub fn load_layout(&mut self, layout: &Layout) {
        self.reset();
        let mut placer = self.placer();

        for track in &layout.tracks {
            if track.track_type.is_crossing() {
                continue;
            }
            if !placer.grid.set(track.row, track.col, TrackCell::plain(track.track_type)) {
                log::warn!("skipping off-board track at ({}, {})", track.row, track.col);
            }
        }

        for crossing in &layout.crossings {
            placer.insert_crossing(crossing.row, crossing.col, crossing.horizontal);
        }

        for entry in &layout.trains {
            if !placer.grid.has_track(entry.row, entry.col) {
                log::warn!("skipping train at ({}, {}): no track", entry.row, entry.col);
                continue;
            }
            let pos = TrackPos {
                row: entry.row,
                col: entry.col,
                travel_dir: entry.dir,
                enter_dir: entry.enter_dir,
                progress: 0.0,
            };
            let id = placer.spawn_train(entry.engine_type, pos);
            for &car in &entry.cars {
                placer.attach_car_to(id, car);
            }
        }

        self.recompute_poses();
        self.events.clear();
        log::info!(
            "loaded layout: {} tracks, {} trains, {} crossings",
            self.grid.track_count(),
            self.trains.len(),
            self.crossings.len()
        );
    }

    /// Snapshot the current state as a layout document.
    pub fn export_layout(&self) -> Layout {
        let tracks = self
            .grid
            .iter()
            .filter(|(_, _, cell)| cell.crossing.map_or(true, |l| l.role != CrossingRole::End))
            .map(|(row, col, cell)| TrackEntry {
                row,
                col,
                track_type: cell.piece,
            })
            .collect();

        let trains = self
            .trains
            .iter()
            .map(|(_, train)| {
                let engine = train.engine().pos;
                TrainEntry {
                    row: engine.row,
                    col: engine.col,
                    engine_type: train.engine_kind(),
                    dir: engine.travel_dir,
                    enter_dir: engine.enter_dir,
                    cars: train.cars().collect(),
                }
            })
            .collect();

        let crossings = self
            .crossings
            .iter()
            .map(|(_, c)| CrossingEntry {
                row: c.row,
                col: c.col,
                horizontal: c.horizontal,
            })
            .collect();

        Layout {
            tracks,
            trains,
            crossings,
        }
    }
}
