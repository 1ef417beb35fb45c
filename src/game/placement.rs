//! Tool handling: turns a tool and a target cell into concrete grid edits,
//! and cleans up trains and crossings that depended on removed track.

use std::fmt;
use std::str::FromStr;

use crate::app::RailEvent;
use crate::error::Error;
use crate::sim::crossing::{Crossing, Crossings};
use crate::sim::motion;
use crate::sim::train::{CarKind, EngineKind, TrackPos, Train, TrainId, Trains};

use super::config::RailwayConfig;
use super::grid::{CrossingId, CrossingLink, CrossingRole, Direction, Grid, TrackCell};
use super::track::PieceType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Straight,
    Curve,
    Crossing,
    Tunnel,
    Delete,
    Engine(EngineKind),
    Car(CarKind),
    RemoveTrain,
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || Error::UnknownTool(s.to_string());
        match s {
            "straight" => Ok(Self::Straight),
            "curve" => Ok(Self::Curve),
            "crossing" => Ok(Self::Crossing),
            "tunnel" => Ok(Self::Tunnel),
            "delete" => Ok(Self::Delete),
            "remove-train" => Ok(Self::RemoveTrain),
            _ => {
                let (prefix, kind) = s.split_once(':').ok_or_else(unknown)?;
                match prefix {
                    "engine" => kind.parse().map(Self::Engine).map_err(|_| unknown()),
                    "car" => kind.parse().map(Self::Car).map_err(|_| unknown()),
                    _ => Err(unknown()),
                }
            }
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Straight => f.write_str("straight"),
            Self::Curve => f.write_str("curve"),
            Self::Crossing => f.write_str("crossing"),
            Self::Tunnel => f.write_str("tunnel"),
            Self::Delete => f.write_str("delete"),
            Self::RemoveTrain => f.write_str("remove-train"),
            Self::Engine(kind) => write!(f, "engine:{}", kind.name()),
            Self::Car(kind) => write!(f, "car:{}", kind.name()),
        }
    }
}

/// Borrowed view over everything a tool may edit.
pub struct Placer<'a> {
    pub grid: &'a mut Grid,
    pub trains: &'a mut Trains,
    pub crossings: &'a mut Crossings,
    pub config: &'a RailwayConfig,
    pub events: &'a mut Vec<RailEvent>,
}

impl Placer<'_> {
    /// Apply `tool` at a cell. Returns `true` if anything changed.
    pub fn apply(&mut self, tool: Tool, row: i32, col: i32) -> bool {
        if !Grid::in_bounds(row, col) {
            log::debug!("{tool} at ({row}, {col}) is off the board");
            return false;
        }
        match tool {
            Tool::Straight => self.place_straight(row, col),
            Tool::Curve => self.place_curve(row, col),
            Tool::Crossing => self.place_crossing(row, col),
            Tool::Tunnel => self.place_tunnel(row, col),
            Tool::Delete => self.delete(row, col),
            Tool::Engine(kind) => self.place_engine(kind, row, col).is_some(),
            Tool::Car(kind) => self.attach_car(kind, row, col),
            Tool::RemoveTrain => self.remove_train_at(row, col),
        }
    }

    fn put(&mut self, row: i32, col: i32, piece: PieceType) {
        self.grid.set(row, col, TrackCell::plain(piece));
        self.events.push(RailEvent::Placed { row, col });
    }

    fn place_straight(&mut self, row: i32, col: i32) -> bool {
        match self.grid.piece_at(row, col) {
            Some(piece) if piece.is_straight() => {
                log::debug!("toggling {piece:?} at ({row}, {col})");
                self.put(row, col, piece.toggled());
                true
            }
            Some(piece) => {
                log::debug!("straight tool leaves {piece:?} at ({row}, {col}) alone");
                false
            }
            None => {
                let horizontal = self.infer_straight_axis(row, col);
                log::debug!("straight at ({row}, {col}) inferred horizontal={horizontal}");
                self.put(row, col, PieceType::straight(horizontal));
                true
            }
        }
    }

    /// Axis from the first neighboring track in Up, Right, Down, Left order;
    /// horizontal when there is none.
    fn infer_straight_axis(&self, row: i32, col: i32) -> bool {
        Direction::ALL
            .iter()
            .find(|&&dir| {
                let (r, c) = Grid::neighbor(row, col, dir);
                self.grid.has_track(r, c)
            })
            .map_or(true, |dir| dir.is_horizontal())
    }

    fn place_curve(&mut self, row: i32, col: i32) -> bool {
        match self.grid.piece_at(row, col) {
            Some(piece) if piece.is_curve() => {
                let next = piece.next_curve();
                log::debug!("cycling {piece:?} -> {next:?} at ({row}, {col})");
                self.put(row, col, next);
                true
            }
            Some(piece) => {
                log::debug!("curve tool leaves {piece:?} at ({row}, {col}) alone");
                false
            }
            None => {
                self.put(row, col, PieceType::CurveTL);
                true
            }
        }
    }

    /// Horizontal unless the only neighboring track is above or below.
    fn infer_crossing_axis(&self, row: i32, col: i32) -> bool {
        let has = |dir: Direction| {
            let (r, c) = Grid::neighbor(row, col, dir);
            self.grid.has_track(r, c)
        };
        let horizontal_track = has(Direction::Left) || has(Direction::Right);
        let vertical_track = has(Direction::Up) || has(Direction::Down);
        horizontal_track || !vertical_track
    }

    fn place_crossing(&mut self, row: i32, col: i32) -> bool {
        let horizontal = self.infer_crossing_axis(row, col);
        let [_, (row2, col2)] = Crossing::span(row, col, horizontal);
        if !Grid::in_bounds(row2, col2) {
            log::warn!("crossing at ({row}, {col}) has no room for its second cell");
            return false;
        }

        // An existing crossing under the target gets replaced
        let existing = self.grid.get(row, col).and_then(|c| c.crossing).map(|l| l.id);
        for (r, c) in [(row, col), (row2, col2)] {
            let Some(cell) = self.grid.get(r, c) else { continue };
            match cell.crossing {
                Some(link) if Some(link.id) == existing => {}
                Some(_) => {
                    log::warn!("crossing at ({row}, {col}) overlaps another crossing at ({r}, {c})");
                    return false;
                }
                None if cell.piece.is_straight() => {}
                None => {
                    log::warn!("crossing at ({row}, {col}) blocked by {:?} at ({r}, {c})", cell.piece);
                    return false;
                }
            }
        }

        let replaced = match existing {
            Some(id) => self.remove_crossing(id),
            None => Vec::new(),
        };
        self.insert_crossing(row, col, horizontal);
        // Cells of the old crossing the new one doesn't cover are gone
        let vacated: Vec<(i32, i32)> = replaced
            .into_iter()
            .filter(|&(r, c)| !self.grid.has_track(r, c))
            .collect();
        self.cascade(&vacated);
        true
    }

    /// Create a crossing and write both of its cells, overwriting whatever
    /// they held.
    pub fn insert_crossing(&mut self, row: i32, col: i32, horizontal: bool) -> Option<CrossingId> {
        let [start, end] = Crossing::span(row, col, horizontal);
        if !Grid::in_bounds(start.0, start.1) || !Grid::in_bounds(end.0, end.1) {
            log::warn!("crossing at ({row}, {col}) does not fit on the board");
            return None;
        }
        let id = self.crossings.insert(Crossing::new(row, col, horizontal));
        let piece = PieceType::crossing(horizontal);
        for ((r, c), role) in [(start, CrossingRole::Start), (end, CrossingRole::End)] {
            self.grid.set(r, c, TrackCell {
                piece,
                crossing: Some(CrossingLink { id, role }),
            });
            self.events.push(RailEvent::Placed { row: r, col: c });
        }
        Some(id)
    }

    fn place_tunnel(&mut self, row: i32, col: i32) -> bool {
        let tunnel = self
            .grid
            .get(row, col)
            .filter(|cell| cell.crossing.is_none())
            .and_then(|cell| cell.piece.tunneled());
        match tunnel {
            Some(piece) => {
                self.put(row, col, piece);
                true
            }
            None => {
                log::warn!("tunnel needs a plain straight at ({row}, {col})");
                false
            }
        }
    }

    /// Remove a crossing entity and clear the cells that still point at it.
    fn remove_crossing(&mut self, id: CrossingId) -> Vec<(i32, i32)> {
        let Some(crossing) = self.crossings.remove(id) else {
            return Vec::new();
        };
        if crossing.active {
            self.events.push(RailEvent::CrossingDeactivated(id));
        }
        let mut cleared = Vec::new();
        for (r, c) in crossing.cells() {
            let owned = self
                .grid
                .get(r, c)
                .and_then(|cell| cell.crossing)
                .is_some_and(|link| link.id == id);
            if owned {
                self.grid.clear(r, c);
                cleared.push((r, c));
            }
        }
        cleared
    }

    fn delete(&mut self, row: i32, col: i32) -> bool {
        let Some(cell) = self.grid.get(row, col).copied() else {
            return false;
        };
        let mut cleared = match cell.crossing {
            Some(link) => self.remove_crossing(link.id),
            None => Vec::new(),
        };
        if !cleared.contains(&(row, col)) {
            self.grid.clear(row, col);
            cleared.push((row, col));
        }
        self.cascade(&cleared);
        true
    }

    /// Report cleared cells and drop trains whose engine was on one.
    fn cascade(&mut self, cleared: &[(i32, i32)]) {
        for &(row, col) in cleared {
            self.events.push(RailEvent::Removed { row, col });
        }
        for id in self.trains.remove_engines_in(cleared) {
            log::info!("train {id:?} removed with its track");
            self.events.push(RailEvent::TrainRemoved(id));
        }
    }

    /// Put a new engine on a track cell, facing the piece's canonical entry.
    pub fn place_engine(&mut self, kind: EngineKind, row: i32, col: i32) -> Option<TrainId> {
        let Some(piece) = self.grid.piece_at(row, col) else {
            log::warn!("no track for an engine at ({row}, {col})");
            return None;
        };
        if self.trains.train_at(row, col).is_some() {
            log::warn!("({row}, {col}) already holds a train");
            return None;
        }
        Some(self.spawn_train(kind, TrackPos::new(row, col, piece.canonical_entry())))
    }

    /// Insert a train at an exact track position.
    pub fn spawn_train(&mut self, kind: EngineKind, pos: TrackPos) -> TrainId {
        let mut train = Train::new(kind, pos, self.config.train.speed_for(kind));
        motion::refresh_poses(&mut train, self.grid, self.config.world.cell_size);
        let id = self.trains.insert(train);
        self.events.push(RailEvent::TrainPlaced(id));
        id
    }

    /// Attach a car to the tail of the train occupying the cell.
    fn attach_car(&mut self, kind: CarKind, row: i32, col: i32) -> bool {
        let Some(id) = self.trains.train_at(row, col) else {
            log::debug!("no train at ({row}, {col}) to attach a car to");
            return false;
        };
        self.attach_car_to(id, kind)
    }

    pub fn attach_car_to(&mut self, id: TrainId, kind: CarKind) -> bool {
        let Some(train) = self.trains.get_mut(id) else {
            return false;
        };
        let spacing = self.config.train.spacing_for(train.segments.len());
        train.attach_car(kind, self.grid, spacing, self.config.sim.max_backsteps);
        motion::refresh_poses(train, self.grid, self.config.world.cell_size);
        let (row, col) = train.tail().pos.cell();
        self.events.push(RailEvent::Placed { row, col });
        true
    }

    fn remove_train_at(&mut self, row: i32, col: i32) -> bool {
        let Some(id) = self.trains.train_at(row, col) else {
            return false;
        };
        self.trains.remove(id);
        self.events.push(RailEvent::TrainRemoved(id));
        true
    }
}
