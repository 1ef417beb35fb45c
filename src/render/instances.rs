//! Per-instance data handed to an external renderer.
//!
//! Each struct is `#[repr(C)]` + `bytemuck::Pod` so a renderer can upload
//! a slice with `bytemuck::cast_slice` and draw every train segment or
//! crossing in one instanced call. Nothing here is written back into the
//! simulation.

use glam::Vec3;

use crate::app::Railway;
use crate::game::grid::Grid;
use crate::sim::train::SegmentKind;

/// Segment is inside a tunnel cell.
pub const FLAG_IN_TUNNEL: u32 = 1;
/// Engine is a moving steam engine in the open.
pub const FLAG_SMOKE: u32 = 1 << 1;
/// Train has stopped for good.
pub const FLAG_STOPPED: u32 = 1 << 2;

/// Car kinds are numbered after this offset so they never collide with
/// engine kinds.
pub const CAR_KIND_BASE: u32 = 8;

/// One engine or car.
///
/// 24 bytes (6 words).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SegmentInstance {
    /// World position on the ground plane.
    pub position: [f32; 3],
    /// Heading in radians, `atan2(dz, dx)`.
    pub heading: f32,
    /// Engine kind index, or `CAR_KIND_BASE` + car kind index.
    pub kind: u32,
    /// Bitwise OR of the `FLAG_*` constants.
    pub flags: u32,
}

/// One level crossing, positioned between its two cells.
///
/// 28 bytes (7 words).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CrossingInstance {
    pub position: [f32; 3],
    pub horizontal: u32,
    pub active: u32,
    /// Which light of the pair is lit (0 or 1).
    pub blink_on: u32,
    /// Angle the arms are easing towards.
    pub arm_target: f32,
}

pub fn kind_code(kind: SegmentKind) -> u32 {
    match kind {
        SegmentKind::Engine(k) => k as u32,
        SegmentKind::Car(k) => CAR_KIND_BASE + k as u32,
    }
}

/// Build instances for every segment of every train, head to tail.
pub fn segment_instances(railway: &Railway) -> Vec<SegmentInstance> {
    let mut out = Vec::new();
    for (_, train) in railway.trains().iter() {
        let smoke = train.emits_smoke() && !train.engine().in_tunnel;
        for (i, segment) in train.segments.iter().enumerate() {
            let mut flags = 0;
            if segment.in_tunnel {
                flags |= FLAG_IN_TUNNEL;
            }
            if i == 0 && smoke {
                flags |= FLAG_SMOKE;
            }
            if train.stopped {
                flags |= FLAG_STOPPED;
            }
            out.push(SegmentInstance {
                position: segment.pose.position.to_array(),
                heading: segment.pose.heading,
                kind: kind_code(segment.kind),
                flags,
            });
        }
    }
    out
}

pub fn crossing_instances(railway: &Railway) -> Vec<CrossingInstance> {
    let cell_size = railway.config().world.cell_size;
    railway
        .crossings()
        .iter()
        .map(|(_, crossing)| {
            let [(r0, c0), (r1, c1)] = crossing.cells();
            let mid: Vec3 = (Grid::cell_center(r0, c0, cell_size) + Grid::cell_center(r1, c1, cell_size)) * 0.5;
            CrossingInstance {
                position: mid.to_array(),
                horizontal: crossing.horizontal as u32,
                active: crossing.active as u32,
                blink_on: (crossing.active && crossing.blink_phase()) as u32,
                arm_target: crossing.arm_target(),
            }
        })
        .collect()
}

/// Move `current` towards `target` at `rate` radians per second without
/// overshooting.
pub fn ease_arm(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let max_step = (rate * dt).max(0.0);
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}
