use glam::Vec3;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use super::track::PieceType;

/// Cells per side of the layout board.
pub const GRID_SIZE: i32 = 20;

new_key_type! {
    /// Stable handle for a level crossing. Both of the crossing's cells
    /// carry the same id.
    pub struct CrossingId;
}

/// Compass direction on the board. Used both as direction of travel and as
/// a grid offset: Up = row - 1, Down = row + 1, Left = col - 1, Right = col + 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Neighbor probing order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    pub fn rotate_cw(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    pub fn opposite(self) -> Self {
        self.rotate_cw().rotate_cw()
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn arrow_char(self) -> char {
        match self {
            Self::Up => '\u{2191}',    // ↑
            Self::Right => '\u{2192}', // →
            Self::Down => '\u{2193}',  // ↓
            Self::Left => '\u{2190}',  // ←
        }
    }

    /// Grid offset as (d_row, d_col).
    pub fn grid_offset(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
        }
    }

    /// Heading in radians on the ground plane, measured from +x towards +z
    /// (x follows columns, z follows rows).
    pub fn heading(self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Self::Right => 0.0,
            Self::Down => FRAC_PI_2,
            Self::Left => PI,
            Self::Up => -FRAC_PI_2,
        }
    }
}

/// Which half of a two-cell level crossing a cell holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingRole {
    Start,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossingLink {
    pub id: CrossingId,
    pub role: CrossingRole,
}

/// Contents of an occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackCell {
    pub piece: PieceType,
    pub crossing: Option<CrossingLink>,
}

impl TrackCell {
    pub fn plain(piece: PieceType) -> Self {
        Self { piece, crossing: None }
    }
}

/// Fixed-size board of track cells. Performs bounds checking only; what may
/// be placed where is decided by the placement tools.
pub struct Grid {
    cells: Vec<Option<TrackCell>>,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: vec![None; (GRID_SIZE * GRID_SIZE) as usize],
        }
    }

    pub fn in_bounds(row: i32, col: i32) -> bool {
        (0..GRID_SIZE).contains(&row) && (0..GRID_SIZE).contains(&col)
    }

    fn index(row: i32, col: i32) -> Option<usize> {
        Self::in_bounds(row, col).then(|| (row * GRID_SIZE + col) as usize)
    }

    /// Cell contents, or `None` for empty and off-grid cells alike.
    pub fn get(&self, row: i32, col: i32) -> Option<&TrackCell> {
        self.cells.get(Self::index(row, col)?)?.as_ref()
    }

    pub fn piece_at(&self, row: i32, col: i32) -> Option<PieceType> {
        self.get(row, col).map(|cell| cell.piece)
    }

    pub fn has_track(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_some()
    }

    /// Store a cell. Returns `false` if the position is off-grid.
    pub fn set(&mut self, row: i32, col: i32, cell: TrackCell) -> bool {
        match Self::index(row, col) {
            Some(i) => {
                self.cells[i] = Some(cell);
                true
            }
            None => false,
        }
    }

    /// Empty a cell, returning what was there.
    pub fn clear(&mut self, row: i32, col: i32) -> Option<TrackCell> {
        let i = Self::index(row, col)?;
        self.cells[i].take()
    }

    pub fn clear_all(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Position one step away in `dir`. May be off-grid.
    pub fn neighbor(row: i32, col: i32, dir: Direction) -> (i32, i32) {
        let (dr, dc) = dir.grid_offset();
        (row + dr, col + dc)
    }

    /// World-space center of a cell on the y = 0 ground plane. The board is
    /// centered on the origin; x follows columns and z follows rows.
    pub fn cell_center(row: i32, col: i32, cell_size: f32) -> Vec3 {
        let half_grid = GRID_SIZE as f32 * 0.5;
        Vec3::new(
            (col as f32 - half_grid + 0.5) * cell_size,
            0.0,
            (row as f32 - half_grid + 0.5) * cell_size,
        )
    }

    /// Cell containing a ground-plane point, if it lies on the board.
    pub fn cell_at(x: f32, z: f32, cell_size: f32) -> Option<(i32, i32)> {
        let half_grid = GRID_SIZE as f32 * 0.5;
        let col = (x / cell_size + half_grid).floor() as i32;
        let row = (z / cell_size + half_grid).floor() as i32;
        Self::in_bounds(row, col).then_some((row, col))
    }

    /// All occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &TrackCell)> {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            let i = i as i32;
            cell.as_ref().map(|c| (i / GRID_SIZE, i % GRID_SIZE, c))
        })
    }

    pub fn track_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
