use instinct_core::Vec3;

use crate::{estimate_path_length, MotionActuator, MotionSettings, NavPath};

/// Reference actuator: walks a committed path at a ramped speed.
///
/// Hosts with their own movement system implement [`MotionActuator`] directly; the
/// headless simulator drives one of these per creature.
#[derive(Debug, Clone, Default)]
pub struct PathFollower {
    settings: MotionSettings,
    path: Option<NavPath>,
    next_index: usize,
    current_speed: f32,
    velocity: Vec3,
    remaining: f32,
}

impl PathFollower {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn path(&self) -> Option<&NavPath> {
        self.path.as_ref()
    }

    /// Move from `position` along the path for `dt` seconds and return the new position.
    pub fn advance(&mut self, position: Vec3, dt: f32) -> Vec3 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let Some(path) = &self.path else {
            self.current_speed = 0.0;
            self.velocity = Vec3::ZERO;
            return position;
        };

        let target_speed = self.settings.speed.max(0.0);
        let accel = self.settings.acceleration.max(0.0);
        self.current_speed = if self.current_speed < target_speed {
            (self.current_speed + accel * dt).min(target_speed)
        } else {
            target_speed
        };

        let mut budget = self.current_speed * dt;
        let mut current = position;
        while self.next_index < path.points.len() && budget > 0.0 {
            let target = path.points[self.next_index];
            let to_target = target - current;
            let dist = to_target.length();

            if dist <= f32::EPSILON {
                self.next_index += 1;
                continue;
            }

            if budget >= dist {
                current = target;
                self.next_index += 1;
                budget -= dist;
                continue;
            }

            current = current + to_target * (budget / dist);
            break;
        }

        let mut corners = Vec::with_capacity(path.points.len() + 1);
        corners.push(current);
        corners.extend(path.points.iter().skip(self.next_index).copied());
        self.remaining = estimate_path_length(&corners);
        self.velocity = if dt > 0.0 {
            (current - position) / dt
        } else {
            Vec3::ZERO
        };

        let arrived = self.next_index >= path.points.len()
            || self.remaining <= self.settings.stopping_distance.max(0.0);
        if arrived {
            self.reset_path();
        }
        current
    }
}

impl MotionActuator for PathFollower {
    fn settings(&self) -> MotionSettings {
        self.settings
    }

    fn set_speed(&mut self, speed: f32) {
        self.settings.speed = speed;
    }

    fn set_acceleration(&mut self, acceleration: f32) {
        self.settings.acceleration = acceleration;
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.settings.stopping_distance = distance;
    }

    fn set_auto_braking(&mut self, enabled: bool) {
        self.settings.auto_braking = enabled;
    }

    fn set_path(&mut self, path: NavPath) {
        self.remaining = path.length();
        self.next_index = 1.min(path.points.len());
        self.path = Some(path);
    }

    fn reset_path(&mut self) {
        self.path = None;
        self.next_index = 0;
        self.remaining = 0.0;
    }

    fn has_path(&self) -> bool {
        self.path.is_some()
    }

    fn remaining_distance(&self) -> f32 {
        self.remaining
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }
}
