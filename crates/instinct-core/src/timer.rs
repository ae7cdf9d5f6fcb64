#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A duration fact that only grows when set and decays monotonically to zero.
///
/// `latch(d)` raises the remaining time to at least `d`; it never shortens a longer
/// running timer. `is_active()` is true exactly while remaining time is above zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatchTimer {
    remaining: f32,
}

impl LatchTimer {
    pub const fn new() -> Self {
        Self { remaining: 0.0 }
    }

    pub fn latch(&mut self, duration: f32) {
        if duration.is_nan() {
            return;
        }
        self.remaining = self.remaining.max(duration);
    }

    /// Decrease by `dt`, clamped at zero. Negative or non-finite `dt` is ignored.
    pub fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }
}

/// Seconds since something last happened; counts up, starts at "never".
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Elapsed {
    seconds: f32,
}

impl Default for Elapsed {
    fn default() -> Self {
        Self::never()
    }
}

impl Elapsed {
    pub const fn never() -> Self {
        Self {
            seconds: f32::INFINITY,
        }
    }

    pub const fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    pub fn advance(&mut self, dt: f32) {
        if dt > 0.0 && dt.is_finite() {
            self.seconds += dt;
        }
    }

    pub fn reset(&mut self) {
        self.seconds = 0.0;
    }

    pub fn seconds(&self) -> f32 {
        self.seconds
    }
}
