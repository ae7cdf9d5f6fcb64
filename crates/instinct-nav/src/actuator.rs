use instinct_core::Vec3;

use crate::NavPath;

/// Movement parameters applied together with a committed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    pub speed: f32,
    pub acceleration: f32,
    pub stopping_distance: f32,
    pub auto_braking: bool,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            speed: 3.5,
            acceleration: 8.0,
            stopping_distance: 0.5,
            auto_braking: true,
        }
    }
}

/// The host's path-following agent. The core decides where to go; this moves there.
pub trait MotionActuator {
    fn settings(&self) -> MotionSettings;

    fn set_speed(&mut self, speed: f32);

    fn set_acceleration(&mut self, acceleration: f32);

    fn set_stopping_distance(&mut self, distance: f32);

    fn set_auto_braking(&mut self, enabled: bool);

    fn set_path(&mut self, path: NavPath);

    fn reset_path(&mut self);

    fn has_path(&self) -> bool;

    /// Distance left along the committed path; zero without one.
    fn remaining_distance(&self) -> f32;

    fn velocity(&self) -> Vec3;
}
