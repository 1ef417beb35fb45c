use slotmap::SlotMap;
use std::f32::consts::FRAC_PI_2;

use crate::game::config::SimConfig;
use crate::game::grid::CrossingId;

use super::train::Trains;

/// Arm angle above the road while the crossing is open.
pub const ARM_UP: f32 = FRAC_PI_2;
/// Arm angle across the road while the crossing is closed.
pub const ARM_DOWN: f32 = 0.0;

/// Slack for timers built up from many small frame steps.
const TIMER_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingTransition {
    Activated,
    Deactivated,
}

/// A two-cell level crossing and its signal state.
#[derive(Clone, Debug)]
pub struct Crossing {
    pub row: i32,
    pub col: i32,
    pub horizontal: bool,
    pub active: bool,
    /// Seconds the crossing has been vacant while still active.
    pub deactivate_timer: f64,
    /// Seconds since the lights last flipped.
    pub light_timer: f64,
    blink_on: bool,
}

impl Crossing {
    pub fn new(row: i32, col: i32, horizontal: bool) -> Self {
        Self {
            row,
            col,
            horizontal,
            active: false,
            deactivate_timer: 0.0,
            light_timer: 0.0,
            blink_on: false,
        }
    }

    /// The start cell and the cell after it along the crossing's axis.
    pub fn cells(&self) -> [(i32, i32); 2] {
        Self::span(self.row, self.col, self.horizontal)
    }

    pub fn span(row: i32, col: i32, horizontal: bool) -> [(i32, i32); 2] {
        if horizontal {
            [(row, col), (row, col + 1)]
        } else {
            [(row, col), (row + 1, col)]
        }
    }

    pub fn contains(&self, row: i32, col: i32) -> bool {
        self.cells().contains(&(row, col))
    }

    /// Whether any segment of a moving train is inside the crossing.
    pub fn is_occupied(&self, trains: &Trains) -> bool {
        trains
            .iter()
            .filter(|(_, t)| !t.stopped)
            .flat_map(|(_, t)| t.segments.iter())
            .any(|s| self.contains(s.pos.row, s.pos.col))
    }

    /// Advance the signal by `dt` given this tick's occupancy.
    pub fn update(&mut self, occupied: bool, dt: f64, config: &SimConfig) -> Option<CrossingTransition> {
        let mut transition = None;
        if occupied {
            self.deactivate_timer = 0.0;
            if !self.active {
                self.active = true;
                self.light_timer = 0.0;
                self.blink_on = true;
                transition = Some(CrossingTransition::Activated);
            }
        } else if self.active {
            self.deactivate_timer += dt;
            if self.deactivate_timer + TIMER_EPSILON >= config.crossing_grace {
                self.reset();
                return Some(CrossingTransition::Deactivated);
            }
        }

        if self.active && transition.is_none() {
            self.light_timer += dt;
            while config.blink_interval > 0.0 && self.light_timer + TIMER_EPSILON >= config.blink_interval {
                self.light_timer -= config.blink_interval;
                self.blink_on = !self.blink_on;
            }
        }
        transition
    }

    /// Which light of the pair is lit. Meaningless while inactive.
    pub fn blink_phase(&self) -> bool {
        self.blink_on
    }

    /// Angle the arms should ease towards.
    pub fn arm_target(&self) -> f32 {
        if self.active { ARM_DOWN } else { ARM_UP }
    }

    fn reset(&mut self) {
        self.active = false;
        self.deactivate_timer = 0.0;
        self.light_timer = 0.0;
        self.blink_on = false;
    }
}

pub struct Crossings {
    crossings: SlotMap<CrossingId, Crossing>,
}

impl Crossings {
    pub fn new() -> Self {
        Self {
            crossings: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, crossing: Crossing) -> CrossingId {
        self.crossings.insert(crossing)
    }

    pub fn remove(&mut self, id: CrossingId) -> Option<Crossing> {
        self.crossings.remove(id)
    }

    pub fn get(&self, id: CrossingId) -> Option<&Crossing> {
        self.crossings.get(id)
    }

    pub fn len(&self) -> usize {
        self.crossings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crossings.is_empty()
    }

    pub fn clear(&mut self) {
        self.crossings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (CrossingId, &Crossing)> {
        self.crossings.iter()
    }

    /// Run one tick for every crossing against the current train positions.
    pub fn tick(&mut self, trains: &Trains, dt: f64, config: &SimConfig) -> Vec<(CrossingId, CrossingTransition)> {
        let mut transitions = Vec::new();
        for (id, crossing) in self.crossings.iter_mut() {
            let occupied = crossing.is_occupied(trains);
            if let Some(t) = crossing.update(occupied, dt, config) {
                transitions.push((id, t));
            }
        }
        transitions
    }
}

impl Default for Crossings {
    fn default() -> Self {
        Self::new()
    }
}
