use glam::Vec3;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::str::FromStr;

use crate::error::Error;
use crate::game::grid::{Direction, Grid};

new_key_type! {
    /// Identifies a train in the consist store.
    pub struct TrainId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Steam,
    Diesel,
    Electric,
}

impl EngineKind {
    pub fn has_smoke(self) -> bool {
        matches!(self, Self::Steam)
    }

    /// Identifier used in tool strings and layout documents.
    pub fn name(self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Diesel => "diesel",
            Self::Electric => "electric",
        }
    }

    pub fn all() -> &'static [EngineKind] {
        &[Self::Steam, Self::Diesel, Self::Electric]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarKind {
    Passenger,
    Freight,
    Tanker,
    Coal,
    Caboose,
}

impl CarKind {
    pub fn all() -> &'static [CarKind] {
        &[Self::Passenger, Self::Freight, Self::Tanker, Self::Coal, Self::Caboose]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Passenger => "passenger",
            Self::Freight => "freight",
            Self::Tanker => "tanker",
            Self::Coal => "coal",
            Self::Caboose => "caboose",
        }
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

impl FromStr for CarKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Engine(EngineKind),
    Car(CarKind),
}

/// Where a segment sits on the track: its cell, the direction it entered
/// that cell with, and how far through the cell it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPos {
    pub row: i32,
    pub col: i32,
    /// Direction the segment is moving in. Always equal to `enter_dir` once
    /// the segment is inside a cell.
    pub travel_dir: Direction,
    /// Direction of travel used to enter the current cell. Selects which of
    /// the piece's two branches is active.
    pub enter_dir: Direction,
    /// 0 = just entered, 1 = at the exit edge.
    pub progress: f64,
}

impl TrackPos {
    pub fn new(row: i32, col: i32, enter_dir: Direction) -> Self {
        Self {
            row,
            col,
            travel_dir: enter_dir,
            enter_dir,
            progress: 0.0,
        }
    }

    pub fn cell(&self) -> (i32, i32) {
        (self.row, self.col)
    }

    /// The cell this position was entered from, with the entry direction
    /// that piece would have been travelled with. `None` if the previous
    /// cell is off-grid, empty, or doesn't lead into this one.
    pub fn step_back(&self, grid: &Grid) -> Option<TrackPos> {
        let (dr, dc) = self.enter_dir.grid_offset();
        let (row, col) = (self.row - dr, self.col - dc);
        let piece = grid.piece_at(row, col)?;
        let enter = piece.enter_for_exit(self.enter_dir)?;
        Some(TrackPos::new(row, col, enter))
    }

    /// Position `spacing` cells behind this one along the track. Walks back
    /// through whole cells as needed, clamping to the start of the earliest
    /// reachable cell when the track runs out or `max_steps` is hit.
    pub fn trail(&self, grid: &Grid, spacing: f64, max_steps: u32) -> TrackPos {
        let mut pos = *self;
        let mut progress = self.progress - spacing;
        let mut steps = 0;
        while progress < 0.0 {
            if steps >= max_steps {
                progress = 0.0;
                break;
            }
            match pos.step_back(grid) {
                Some(prev) => {
                    pos = prev;
                    progress += 1.0;
                    steps += 1;
                }
                None => {
                    progress = 0.0;
                    break;
                }
            }
        }
        pos.progress = progress;
        pos
    }
}

/// World-space placement of a segment, refreshed by the motion engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub heading: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Segment {
    pub kind: SegmentKind,
    pub pos: TrackPos,
    pub pose: Pose,
    /// Whether the segment's current cell is a tunnel piece.
    pub in_tunnel: bool,
}

impl Segment {
    fn new(kind: SegmentKind, pos: TrackPos) -> Self {
        Self {
            kind,
            pos,
            pose: Pose::default(),
            in_tunnel: false,
        }
    }
}

/// An engine followed by zero or more cars, head to tail.
#[derive(Clone, Debug)]
pub struct Train {
    pub segments: SmallVec<[Segment; 8]>,
    /// Cells per second.
    pub speed: f64,
    pub stopped: bool,
    /// Set by the motion engine when the engine moved during the last tick.
    pub advancing: bool,
}

impl Train {
    pub fn new(kind: EngineKind, pos: TrackPos, speed: f64) -> Self {
        let mut segments = SmallVec::new();
        segments.push(Segment::new(SegmentKind::Engine(kind), pos));
        Self {
            segments,
            speed,
            stopped: false,
            advancing: false,
        }
    }

    pub fn engine(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn engine_kind(&self) -> EngineKind {
        match self.segments[0].kind {
            SegmentKind::Engine(kind) => kind,
            // Segment 0 is always built as an engine
            SegmentKind::Car(_) => EngineKind::Steam,
        }
    }

    pub fn cars(&self) -> impl Iterator<Item = CarKind> + '_ {
        self.segments.iter().filter_map(|s| match s.kind {
            SegmentKind::Car(kind) => Some(kind),
            SegmentKind::Engine(_) => None,
        })
    }

    pub fn tail(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    /// Whether any segment is in the given cell.
    pub fn occupies(&self, row: i32, col: i32) -> bool {
        self.segments.iter().any(|s| s.pos.cell() == (row, col))
    }

    /// Append a car `spacing` cells behind the current tail.
    pub fn attach_car(&mut self, kind: CarKind, grid: &Grid, spacing: f64, max_steps: u32) {
        let pos = self.tail().pos.trail(grid, spacing, max_steps);
        self.segments.push(Segment::new(SegmentKind::Car(kind), pos));
    }

    /// Smoke hook: a moving steam engine. Emitters read `in_tunnel` on the
    /// engine segment to cap the rate.
    pub fn emits_smoke(&self) -> bool {
        self.engine_kind().has_smoke() && self.advancing
    }
}

/// All trains on the layout.
pub struct Trains {
    trains: SlotMap<TrainId, Train>,
}

impl Trains {
    pub fn new() -> Self {
        Self {
            trains: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, train: Train) -> TrainId {
        self.trains.insert(train)
    }

    pub fn remove(&mut self, id: TrainId) -> Option<Train> {
        self.trains.remove(id)
    }

    pub fn get(&self, id: TrainId) -> Option<&Train> {
        self.trains.get(id)
    }

    pub fn get_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        self.trains.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    pub fn clear(&mut self) {
        self.trains.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrainId, &Train)> {
        self.trains.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TrainId, &mut Train)> {
        self.trains.iter_mut()
    }

    /// Train with any segment in the cell.
    pub fn train_at(&self, row: i32, col: i32) -> Option<TrainId> {
        self.trains
            .iter()
            .find(|(_, t)| t.occupies(row, col))
            .map(|(id, _)| id)
    }

    /// Remove every train whose engine sits in one of `cells`. Returns the
    /// removed ids.
    pub fn remove_engines_in(&mut self, cells: &[(i32, i32)]) -> Vec<TrainId> {
        let doomed: Vec<TrainId> = self
            .trains
            .iter()
            .filter(|(_, t)| cells.contains(&t.engine().pos.cell()))
            .map(|(id, _)| id)
            .collect();
        for &id in &doomed {
            self.trains.remove(id);
        }
        doomed
    }
}

impl Default for Trains {
    fn default() -> Self {
        Self::new()
    }
}
