//! Per-tick train movement.
//!
//! Only the engine integrates speed over time. Every car is re-derived from
//! the segment ahead of it by walking a fixed spacing backwards through the
//! connectivity graph, so a consist can never drift apart or cut a corner.

use crate::game::config::RailwayConfig;
use crate::game::grid::Grid;

use super::train::{Pose, TrackPos, Train, TrainId, Trains};

/// Progress within this distance of the exit edge counts as having reached it.
const PROGRESS_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionEvent {
    /// The engine hit the end of the track or a piece it can't enter.
    Stopped,
}

/// Cell a segment moves into when it leaves `pos`, or `None` if the piece
/// doesn't accept the segment's direction or the neighbor is empty or
/// off-grid. A neighbor that can't be travelled with `exit` is still
/// entered; the segment stops at its far edge on the next wrap.
pub fn next_cell(grid: &Grid, pos: &TrackPos) -> Option<TrackPos> {
    let piece = grid.piece_at(pos.row, pos.col)?;
    let exit = piece.exit_for(pos.enter_dir)?;
    let (row, col) = Grid::neighbor(pos.row, pos.col, exit);
    grid.has_track(row, col).then(|| TrackPos::new(row, col, exit))
}

/// World pose of a track position. Falls back to the cell center facing the
/// travel direction when the piece doesn't accept the entry direction.
pub fn segment_pose(grid: &Grid, pos: &TrackPos, cell_size: f32) -> Pose {
    let center = Grid::cell_center(pos.row, pos.col, cell_size);
    let resolved = grid
        .piece_at(pos.row, pos.col)
        .and_then(|piece| piece.pose(pos.enter_dir, pos.progress as f32, cell_size));
    match resolved {
        Some(p) => Pose {
            position: center + glam::Vec3::new(p.offset.x, 0.0, p.offset.y),
            heading: p.heading,
        },
        None => Pose {
            position: center,
            heading: pos.travel_dir.heading(),
        },
    }
}

/// Advance the engine by `speed * dt` and handle the cell transition.
fn advance_engine(train: &mut Train, grid: &Grid, dt: f64) -> Option<MotionEvent> {
    let step = train.speed * dt;
    let pos = &mut train.segments[0].pos;
    pos.progress += step;
    train.advancing = step > 0.0;
    if pos.progress < 1.0 - PROGRESS_EPSILON {
        return None;
    }

    match next_cell(grid, pos) {
        Some(next) => {
            *pos = next;
            None
        }
        None => {
            pos.progress = 1.0;
            train.stopped = true;
            train.advancing = false;
            Some(MotionEvent::Stopped)
        }
    }
}

/// Re-derive every car from the segment ahead of it.
pub fn refresh_followers(train: &mut Train, grid: &Grid, config: &RailwayConfig) {
    for i in 1..train.segments.len() {
        let leader = train.segments[i - 1].pos;
        let spacing = config.train.spacing_for(i);
        train.segments[i].pos = leader.trail(grid, spacing, config.sim.max_backsteps);
    }
}

/// Recompute world poses and tunnel flags for every segment.
pub fn refresh_poses(train: &mut Train, grid: &Grid, cell_size: f32) {
    for segment in train.segments.iter_mut() {
        segment.pose = segment_pose(grid, &segment.pos, cell_size);
        segment.in_tunnel = grid
            .piece_at(segment.pos.row, segment.pos.col)
            .is_some_and(|p| p.is_tunnel());
    }
}

/// Run one tick for a single train. A train whose engine cell has lost its
/// track, or that has stopped, is left untouched.
pub fn step_train(
    train: &mut Train,
    grid: &Grid,
    dt: f64,
    config: &RailwayConfig,
) -> Option<MotionEvent> {
    train.advancing = false;
    if train.stopped {
        return None;
    }
    let engine = train.engine().pos;
    if !grid.has_track(engine.row, engine.col) {
        return None;
    }

    let event = advance_engine(train, grid, dt);
    refresh_followers(train, grid, config);
    refresh_poses(train, grid, config.world.cell_size);
    event
}

/// Run one tick for every train, returning the trains that stopped.
pub fn step_trains(
    trains: &mut Trains,
    grid: &Grid,
    dt: f64,
    config: &RailwayConfig,
) -> Vec<(TrainId, MotionEvent)> {
    let mut events = Vec::new();
    for (id, train) in trains.iter_mut() {
        if let Some(event) = step_train(train, grid, dt, config) {
            events.push((id, event));
        }
    }
    events
}

/// Recompute followers and poses without moving anything. Used after a
/// layout load so the first frame is already in place.
pub fn refresh_all(trains: &mut Trains, grid: &Grid, config: &RailwayConfig) {
    for (_, train) in trains.iter_mut() {
        let engine = train.engine().pos;
        if !grid.has_track(engine.row, engine.col) {
            continue;
        }
        refresh_followers(train, grid, config);
        refresh_poses(train, grid, config.world.cell_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::{Direction, TrackCell};
    use crate::game::track::PieceType;
    use crate::sim::train::{CarKind, EngineKind};

    const GRID_END: i32 = crate::game::grid::GRID_SIZE;

    fn strip(grid: &mut Grid, row: i32, cols: std::ops::Range<i32>) {
        for col in cols {
            grid.set(row, col, TrackCell::plain(PieceType::StraightH));
        }
    }

    /// Rectangular loop with corners at (r0,c0) and (r1,c1).
    fn ring(grid: &mut Grid, r0: i32, c0: i32, r1: i32, c1: i32) {
        for col in c0 + 1..c1 {
            grid.set(r0, col, TrackCell::plain(PieceType::StraightH));
            grid.set(r1, col, TrackCell::plain(PieceType::StraightH));
        }
        for row in r0 + 1..r1 {
            grid.set(row, c0, TrackCell::plain(PieceType::StraightV));
            grid.set(row, c1, TrackCell::plain(PieceType::StraightV));
        }
        grid.set(r0, c0, TrackCell::plain(PieceType::CurveBR));
        grid.set(r0, c1, TrackCell::plain(PieceType::CurveBL));
        grid.set(r1, c0, TrackCell::plain(PieceType::CurveTR));
        grid.set(r1, c1, TrackCell::plain(PieceType::CurveTL));
    }

    #[test]
    fn three_cell_strip_scenario() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        strip(&mut grid, 0, 0..3);
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 0, Direction::Right), 1.0);

        for _ in 0..10 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        assert_eq!(train.engine().pos.cell(), (0, 1));
        assert!(train.engine().pos.progress < 1e-6);
        assert!(!train.stopped);

        let mut stops = 0;
        for _ in 0..20 {
            if step_train(&mut train, &grid, 0.1, &config) == Some(MotionEvent::Stopped) {
                stops += 1;
            }
        }
        assert_eq!(stops, 1);
        assert!(train.stopped);
        assert_eq!(train.engine().pos.cell(), (0, 2));
        assert_eq!(train.engine().pos.progress, 1.0);
    }

    #[test]
    fn stopped_train_does_not_move() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        strip(&mut grid, 0, 0..1);
        let mut train = Train::new(EngineKind::Diesel, TrackPos::new(0, 0, Direction::Right), 1.0);
        for _ in 0..15 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        assert!(train.stopped);
        let before = train.engine().pos;
        for _ in 0..10 {
            assert_eq!(step_train(&mut train, &grid, 0.1, &config), None);
        }
        assert_eq!(train.engine().pos, before);
        assert!(!train.advancing);
    }

    #[test]
    fn progress_increases_until_wrap() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        strip(&mut grid, 3, 0..GRID_END);
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(3, 0, Direction::Right), 0.7);
        let mut last = train.engine().pos;
        for _ in 0..100 {
            step_train(&mut train, &grid, 1.0 / 30.0, &config);
            let now = train.engine().pos;
            if now.cell() == last.cell() {
                assert!(now.progress > last.progress);
            } else {
                assert_eq!(now.col, last.col + 1);
                assert!(now.progress < last.progress);
            }
            last = now;
        }
    }

    #[test]
    fn engine_runs_round_a_loop() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        ring(&mut grid, 2, 2, 5, 6);
        let mut train = Train::new(EngineKind::Electric, TrackPos::new(2, 3, Direction::Right), 1.0);
        let mut visited = std::collections::HashSet::new();
        for _ in 0..(14 * 10 + 5) {
            step_train(&mut train, &grid, 0.1, &config);
            visited.insert(train.engine().pos.cell());
        }
        assert!(!train.stopped);
        // 14 cells around the ring, all visited
        assert_eq!(visited.len(), 14);
        assert!(visited.contains(&(5, 2)));
        assert!(visited.contains(&(2, 6)));
    }

    #[test]
    fn followers_are_idempotent_under_rederivation() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        ring(&mut grid, 1, 1, 4, 5);
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(1, 3, Direction::Right), 1.3);
        for kind in [CarKind::Coal, CarKind::Passenger, CarKind::Caboose] {
            let spacing = config.train.spacing_for(train.segments.len());
            train.attach_car(kind, &grid, spacing, config.sim.max_backsteps);
        }
        for _ in 0..137 {
            step_train(&mut train, &grid, 0.05, &config);
        }
        for i in 1..train.segments.len() {
            let leader = train.segments[i - 1].pos;
            let derived = leader.trail(&grid, config.train.spacing_for(i), config.sim.max_backsteps);
            assert_eq!(derived, train.segments[i].pos);
        }
    }

    #[test]
    fn cars_follow_through_curves() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        ring(&mut grid, 0, 0, 3, 3);
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 1, Direction::Right), 1.0);
        train.attach_car(CarKind::Freight, &grid, config.train.first_car_spacing, 16);
        for _ in 0..35 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        // Engine has turned the corner into the right column
        assert_eq!(train.engine().pos.cell(), (1, 3));
        let car = train.segments[1].pos;
        assert_eq!(car.cell(), (0, 3));
        assert_eq!(car.enter_dir, Direction::Right);
        let gap = train.segments[0].pose.position.distance(train.segments[1].pose.position);
        assert!(gap > 0.5 && gap < 2.0, "gap {gap}");
    }

    #[test]
    fn engine_on_deleted_cell_is_inert() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        strip(&mut grid, 0, 0..3);
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 1, Direction::Right), 1.0);
        step_train(&mut train, &grid, 0.1, &config);
        grid.clear(0, 1);
        let before = train.engine().pos;
        for _ in 0..20 {
            assert_eq!(step_train(&mut train, &grid, 0.1, &config), None);
        }
        assert_eq!(train.engine().pos, before);
        assert!(!train.stopped);
    }

    #[test]
    fn wrong_way_segment_stops_at_edge() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        grid.set(0, 0, TrackCell::plain(PieceType::StraightV));
        grid.set(0, 1, TrackCell::plain(PieceType::StraightH));
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 0, Direction::Right), 1.0);
        for _ in 0..12 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        assert!(train.stopped);
        assert_eq!(train.engine().pos.cell(), (0, 0));
        assert_eq!(train.engine().pos.progress, 1.0);
    }

    #[test]
    fn engine_enters_a_mismatched_neighbor_then_stops() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        grid.set(0, 0, TrackCell::plain(PieceType::StraightH));
        grid.set(0, 1, TrackCell::plain(PieceType::StraightV));
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 0, Direction::Right), 1.0);

        for _ in 0..10 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        assert!(!train.stopped);
        assert_eq!(train.engine().pos.cell(), (0, 1));
        // Falls back to the cell center while the piece can't resolve a path
        assert_eq!(train.engine().pose.position, Grid::cell_center(0, 1, config.world.cell_size));

        let mut stops = 0;
        for _ in 0..20 {
            if step_train(&mut train, &grid, 0.1, &config) == Some(MotionEvent::Stopped) {
                stops += 1;
            }
        }
        assert_eq!(stops, 1);
        assert!(train.stopped);
        assert_eq!(train.engine().pos.cell(), (0, 1));
        assert_eq!(train.engine().pos.progress, 1.0);
    }

    #[test]
    fn tunnel_flag_tracks_engine_cell() {
        let config = RailwayConfig::default();
        let mut grid = Grid::new();
        strip(&mut grid, 0, 0..3);
        grid.set(0, 1, TrackCell::plain(PieceType::TunnelH));
        let mut train = Train::new(EngineKind::Steam, TrackPos::new(0, 0, Direction::Right), 1.0);
        step_train(&mut train, &grid, 0.1, &config);
        assert!(!train.engine().in_tunnel);
        assert!(train.advancing);
        for _ in 0..10 {
            step_train(&mut train, &grid, 0.1, &config);
        }
        assert_eq!(train.engine().pos.cell(), (0, 1));
        assert!(train.engine().in_tunnel);
        assert!(train.emits_smoke());
    }

    #[test]
    fn pose_matches_progress_on_straight() {
        let grid = {
            let mut g = Grid::new();
            strip(&mut g, 4, 4..5);
            g
        };
        let mut pos = TrackPos::new(4, 4, Direction::Left);
        pos.progress = 0.25;
        let pose = segment_pose(&grid, &pos, 2.0);
        let center = Grid::cell_center(4, 4, 2.0);
        assert!((pose.position.x - (center.x + 0.5)).abs() < 1e-5);
        assert!((pose.position.z - center.z).abs() < 1e-5);
        assert!((pose.heading - std::f32::consts::PI).abs() < 1e-5);
    }
}
