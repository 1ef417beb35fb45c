//! Track piece types and the connectivity algebra.
//!
//! Every piece accepts exactly two directions of travel. A train leaving a
//! cell keeps its compass direction into the next cell, so the exit
//! direction of one cell is the entry direction of the next.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use super::grid::Direction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    #[serde(rename = "straight-h")]
    StraightH,
    #[serde(rename = "straight-v")]
    StraightV,
    /// Arc between the top and left edges.
    #[serde(rename = "curve-tl")]
    CurveTL,
    /// Arc between the top and right edges.
    #[serde(rename = "curve-tr")]
    CurveTR,
    /// Arc between the bottom and left edges.
    #[serde(rename = "curve-bl")]
    CurveBL,
    /// Arc between the bottom and right edges.
    #[serde(rename = "curve-br")]
    CurveBR,
    #[serde(rename = "crossing-h")]
    CrossingH,
    #[serde(rename = "crossing-v")]
    CrossingV,
    #[serde(rename = "tunnel-h")]
    TunnelH,
    #[serde(rename = "tunnel-v")]
    TunnelV,
}

/// Curve variants in the order the curve tool cycles through them.
pub const CURVE_CYCLE: [PieceType; 4] = [
    PieceType::CurveTL,
    PieceType::CurveTR,
    PieceType::CurveBL,
    PieceType::CurveBR,
];

impl PieceType {
    pub fn straight(horizontal: bool) -> Self {
        if horizontal { Self::StraightH } else { Self::StraightV }
    }

    pub fn crossing(horizontal: bool) -> Self {
        if horizontal { Self::CrossingH } else { Self::CrossingV }
    }

    pub fn is_straight(self) -> bool {
        matches!(self, Self::StraightH | Self::StraightV)
    }

    pub fn is_curve(self) -> bool {
        matches!(self, Self::CurveTL | Self::CurveTR | Self::CurveBL | Self::CurveBR)
    }

    pub fn is_crossing(self) -> bool {
        matches!(self, Self::CrossingH | Self::CrossingV)
    }

    pub fn is_tunnel(self) -> bool {
        matches!(self, Self::TunnelH | Self::TunnelV)
    }

    /// Straight piece with the other orientation. Other pieces are returned
    /// unchanged.
    pub fn toggled(self) -> Self {
        match self {
            Self::StraightH => Self::StraightV,
            Self::StraightV => Self::StraightH,
            other => other,
        }
    }

    /// Tunnel over this piece, if it is a plain straight.
    pub fn tunneled(self) -> Option<Self> {
        match self {
            Self::StraightH => Some(Self::TunnelH),
            Self::StraightV => Some(Self::TunnelV),
            _ => None,
        }
    }

    /// Next variant in the curve tool's cycle; non-curves start the cycle.
    pub fn next_curve(self) -> Self {
        match self {
            Self::CurveTL => Self::CurveTR,
            Self::CurveTR => Self::CurveBL,
            Self::CurveBL => Self::CurveBR,
            _ => Self::CurveTL,
        }
    }

    /// Exit direction for a train entering with `enter`, or `None` if the
    /// piece doesn't accept that direction.
    pub fn exit_for(self, enter: Direction) -> Option<Direction> {
        use Direction::*;
        match (self, enter) {
            (Self::StraightH | Self::CrossingH | Self::TunnelH, Right) => Some(Right),
            (Self::StraightH | Self::CrossingH | Self::TunnelH, Left) => Some(Left),
            (Self::StraightV | Self::CrossingV | Self::TunnelV, Down) => Some(Down),
            (Self::StraightV | Self::CrossingV | Self::TunnelV, Up) => Some(Up),
            (Self::CurveTL, Down) => Some(Left),
            (Self::CurveTL, Right) => Some(Up),
            (Self::CurveTR, Down) => Some(Right),
            (Self::CurveTR, Left) => Some(Up),
            (Self::CurveBL, Up) => Some(Left),
            (Self::CurveBL, Right) => Some(Down),
            (Self::CurveBR, Up) => Some(Right),
            (Self::CurveBR, Left) => Some(Down),
            _ => None,
        }
    }

    /// Inverse of [`exit_for`](Self::exit_for): the entry direction that
    /// produces `exit` on this piece.
    pub fn enter_for_exit(self, exit: Direction) -> Option<Direction> {
        use Direction::*;
        match (self, exit) {
            (Self::StraightH | Self::CrossingH | Self::TunnelH, Right) => Some(Right),
            (Self::StraightH | Self::CrossingH | Self::TunnelH, Left) => Some(Left),
            (Self::StraightV | Self::CrossingV | Self::TunnelV, Down) => Some(Down),
            (Self::StraightV | Self::CrossingV | Self::TunnelV, Up) => Some(Up),
            (Self::CurveTL, Left) => Some(Down),
            (Self::CurveTL, Up) => Some(Right),
            (Self::CurveTR, Right) => Some(Down),
            (Self::CurveTR, Up) => Some(Left),
            (Self::CurveBL, Left) => Some(Up),
            (Self::CurveBL, Down) => Some(Right),
            (Self::CurveBR, Right) => Some(Up),
            (Self::CurveBR, Down) => Some(Left),
            _ => None,
        }
    }

    /// The two accepted entry directions. The first one is where a newly
    /// placed engine starts.
    pub fn entries(self) -> [Direction; 2] {
        use Direction::*;
        match self {
            Self::StraightH | Self::CrossingH | Self::TunnelH => [Right, Left],
            Self::StraightV | Self::CrossingV | Self::TunnelV => [Down, Up],
            Self::CurveTL => [Down, Right],
            Self::CurveTR => [Down, Left],
            Self::CurveBL => [Up, Right],
            Self::CurveBR => [Up, Left],
        }
    }

    pub fn canonical_entry(self) -> Direction {
        self.entries()[0]
    }

    /// Position and heading at `progress` through the piece for a train that
    /// entered with `enter`. Offsets are relative to the cell center on the
    /// ground plane (x = column axis, y = row axis). Returns `None` if the
    /// piece doesn't accept `enter`.
    pub fn pose(self, enter: Direction, progress: f32, cell_size: f32) -> Option<PiecePose> {
        let exit = self.exit_for(enter)?;
        let half = cell_size * 0.5;
        let from = edge_midpoint(enter.opposite(), half);
        let to = edge_midpoint(exit, half);

        let Some(center) = self.arc_center(half) else {
            return Some(PiecePose {
                offset: from.lerp(to, progress),
                heading: exit.heading(),
            });
        };

        let start = angle_of(from - center);
        let mut end = angle_of(to - center);
        if end - start > PI {
            end -= TAU;
        } else if end - start < -PI {
            end += TAU;
        }
        let theta = start + (end - start) * progress;
        let sweep = if end >= start { 1.0 } else { -1.0 };
        Some(PiecePose {
            offset: center + Vec2::new(theta.cos(), theta.sin()) * half,
            heading: wrap_angle(theta + sweep * FRAC_PI_2),
        })
    }

    /// Corner the arc is drawn around, relative to the cell center.
    fn arc_center(self, half: f32) -> Option<Vec2> {
        match self {
            Self::CurveTL => Some(Vec2::new(-half, -half)),
            Self::CurveTR => Some(Vec2::new(half, -half)),
            Self::CurveBL => Some(Vec2::new(-half, half)),
            Self::CurveBR => Some(Vec2::new(half, half)),
            _ => None,
        }
    }

    pub fn all() -> &'static [PieceType] {
        use PieceType::*;
        &[
            StraightH, StraightV, CurveTL, CurveTR, CurveBL, CurveBR,
            CrossingH, CrossingV, TunnelH, TunnelV,
        ]
    }
}

/// Resolved placement of a point travelling along a piece.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PiecePose {
    pub offset: Vec2,
    pub heading: f32,
}

fn edge_midpoint(side: Direction, half: f32) -> Vec2 {
    let (dr, dc) = side.grid_offset();
    Vec2::new(dc as f32 * half, dr as f32 * half)
}

fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Wrap into (-PI, PI].
fn wrap_angle(a: f32) -> f32 {
    let mut a = a % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}
