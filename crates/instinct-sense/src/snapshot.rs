use instinct_core::{clamp01, TargetId, Vec3};

use crate::TargetState;

/// Distance a target walks per registered footstep.
pub const FOOTSTEP_STRIDE: f32 = 1.05;
/// Footsteps one update can register at most.
pub const MAX_FOOTSTEPS_PER_UPDATE: u32 = 4;
/// Displacement in one update treated as a teleport or respawn rather than movement.
pub const TELEPORT_DISTANCE: f32 = 20.0;

/// Short-lived per-target record kept by one agent's sensors.
///
/// Created the first tick a target is engageable and dropped the first tick it is not.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub id: TargetId,
    pub position: Vec3,
    pub forward: Vec3,
    /// Speed derived from the last position delta.
    pub speed: f32,
    previous_position: Vec3,
    step_accumulator: f32,
    was_holding_item: bool,
    footsteps: u32,
    item_dropped: bool,
    pending_low: f32,
    pending_high: f32,
}

impl TargetSnapshot {
    pub fn new(state: &TargetState) -> Self {
        Self {
            id: state.id,
            position: state.position,
            forward: if state.forward.length_squared() > 0.01 {
                state.forward.normalized()
            } else {
                Vec3::FORWARD
            },
            speed: 0.0,
            previous_position: state.position,
            step_accumulator: 0.0,
            was_holding_item: state.holding_item,
            footsteps: 0,
            item_dropped: false,
            pending_low: 0.0,
            pending_high: 0.0,
        }
    }

    /// Loudness estimate from movement alone.
    pub fn movement_noise(&self) -> f32 {
        clamp01(self.speed * 0.25)
    }

    pub fn update(&mut self, state: &TargetState, dt: f32) {
        self.position = state.position;
        if state.forward.length_squared() > 0.01 {
            self.forward = state.forward.normalized();
        }

        let displacement = if state.position.is_known() && self.previous_position.is_known() {
            state.position - self.previous_position
        } else {
            Vec3::ZERO
        };
        self.previous_position = state.position;
        if displacement.length() > TELEPORT_DISTANCE {
            self.speed = 0.0;
        } else if dt > 0.0 {
            self.speed = displacement.length() / dt;
        }

        self.accumulate_noise(state, displacement.length(), dt);
    }

    fn accumulate_noise(&mut self, state: &TargetState, distance: f32, dt: f32) {
        if state.inside_facility || !distance.is_finite() || distance > TELEPORT_DISTANCE {
            self.step_accumulator = 0.0;
            self.was_holding_item = state.holding_item;
            self.pending_low = 0.0;
            self.pending_high = 0.0;
            return;
        }

        if distance > 0.05 {
            let travelled = self.step_accumulator + distance;
            let strides = (travelled / FOOTSTEP_STRIDE).floor();
            self.step_accumulator = travelled.rem_euclid(FOOTSTEP_STRIDE);
            if strides >= 1.0 {
                let steps = (strides as u32).min(MAX_FOOTSTEPS_PER_UPDATE);
                self.footsteps = self.footsteps.saturating_add(steps);
                self.pending_low = self.pending_low.max(0.25);
            }
        }

        if self.was_holding_item && !state.holding_item {
            self.item_dropped = true;
            self.pending_high = self.pending_high.max(0.85);
        }
        self.was_holding_item = state.holding_item;

        let speed = if dt > 0.0 { distance / dt.max(0.0001) } else { 0.0 };
        if state.sprinting || speed >= 4.25 {
            self.pending_high = self.pending_high.max(clamp01((speed - 3.5) / 3.0));
        } else if speed > 0.8 {
            self.pending_low = self.pending_low.max(clamp01(speed / 4.0));
        }

        if state.voice_active {
            self.pending_high = self.pending_high.max(0.65);
        }
    }

    /// Footsteps and item drops since the last call.
    pub fn take_heat_events(&mut self) -> (u32, bool) {
        let events = (self.footsteps, self.item_dropped);
        self.footsteps = 0;
        self.item_dropped = false;
        events
    }

    /// Pending `(low, high)` noise cue strengths, cleared on read. `None` when silent.
    pub fn take_noise_cue(&mut self) -> Option<(f32, f32)> {
        let cue = (self.pending_low, self.pending_high);
        self.discard_noise_cue();
        (cue.0 > 0.0 || cue.1 > 0.0).then_some(cue)
    }

    pub fn discard_noise_cue(&mut self) {
        self.pending_low = 0.0;
        self.pending_high = 0.0;
    }
}
