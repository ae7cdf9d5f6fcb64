#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunable distances and timings shared by every creature's mode predicates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BalanceProfile {
    pub stalking_min_distance: f32,
    pub stalking_max_distance: f32,
    pub hunting_aggro_distance: f32,
    /// Meters past the last known position to aim for when predicting an intercept.
    pub hunting_prediction_lead: f32,
    pub territorial_radius: f32,
    pub lure_cooldown: f32,
    pub pack_cohesion_radius: f32,
    pub reactive_aggression_multiplier: f32,
}

impl Default for BalanceProfile {
    fn default() -> Self {
        Self {
            stalking_min_distance: 5.0,
            stalking_max_distance: 12.0,
            hunting_aggro_distance: 18.0,
            hunting_prediction_lead: 3.0,
            territorial_radius: 12.0,
            lure_cooldown: 25.0,
            pack_cohesion_radius: 10.0,
            reactive_aggression_multiplier: 1.2,
        }
    }
}

impl BalanceProfile {
    /// Copy with every field forced into its legal range.
    ///
    /// Stalking distances stay ordered, the aggro distance never falls inside the
    /// stalking band, and radii and cooldowns stay positive.
    pub fn sanitized(self) -> Self {
        let stalking_min_distance = finite_or(self.stalking_min_distance, 5.0).max(1.0);
        let stalking_max_distance =
            finite_or(self.stalking_max_distance, 12.0).max(stalking_min_distance + 0.5);
        let hunting_aggro_distance =
            finite_or(self.hunting_aggro_distance, 18.0).max(stalking_max_distance);
        Self {
            stalking_min_distance,
            stalking_max_distance,
            hunting_aggro_distance,
            hunting_prediction_lead: finite_or(self.hunting_prediction_lead, 3.0).max(0.0),
            territorial_radius: finite_or(self.territorial_radius, 12.0).max(1.0),
            lure_cooldown: finite_or(self.lure_cooldown, 25.0).max(1.0),
            pack_cohesion_radius: finite_or(self.pack_cohesion_radius, 10.0).max(1.0),
            reactive_aggression_multiplier: finite_or(self.reactive_aggression_multiplier, 1.2)
                .max(0.1),
        }
    }

    /// Radius inside which a visible target is both acquired and hunted.
    pub fn hunt_engage_distance(&self) -> f32 {
        self.hunting_aggro_distance * 1.5
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
