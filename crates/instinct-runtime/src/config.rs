//! Runtime configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use instinct_core::{BalanceProfile, HeatFieldConfig};
use serde::{Deserialize, Serialize};

/// Top-level runtime configuration, usually loaded from `instinct.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Distances and timings shared by every creature.
    pub balance: BalanceConfig,

    /// Shared noise heat field.
    pub heat_field: HeatFieldConfig,

    /// Seconds before a missing world anchor is looked up again.
    #[serde(default = "default_anchor_retry")]
    pub anchor_retry_seconds: f32,

    /// Seed for every deterministic random stream.
    pub seed: u64,
}

fn default_anchor_retry() -> f32 {
    2.0
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            balance: BalanceConfig::default(),
            heat_field: HeatFieldConfig::default(),
            anchor_retry_seconds: default_anchor_retry(),
            seed: 0,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load `path` when given and present, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// The clamped balance profile agents are evaluated with.
    pub fn profile(&self) -> BalanceProfile {
        self.balance.to_profile()
    }
}

/// Operator-facing balance knobs. Values are clamped by [`BalanceConfig::to_profile`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub stalking_min_distance: f32,
    pub stalking_max_distance: f32,
    pub hunting_aggro_distance: f32,
    pub hunting_prediction_lead: f32,
    pub territorial_radius: f32,
    pub lure_cooldown: f32,
    pub pack_cohesion_radius: f32,
    pub reactive_aggression_multiplier: f32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            stalking_min_distance: 6.0,
            stalking_max_distance: 15.0,
            hunting_aggro_distance: 20.0,
            hunting_prediction_lead: 4.0,
            territorial_radius: 12.0,
            lure_cooldown: 30.0,
            pack_cohesion_radius: 10.0,
            reactive_aggression_multiplier: 1.35,
        }
    }
}

impl BalanceConfig {
    pub fn to_profile(&self) -> BalanceProfile {
        BalanceProfile {
            stalking_min_distance: self.stalking_min_distance,
            stalking_max_distance: self.stalking_max_distance,
            hunting_aggro_distance: self.hunting_aggro_distance,
            hunting_prediction_lead: self.hunting_prediction_lead,
            territorial_radius: self.territorial_radius,
            lure_cooldown: self.lure_cooldown,
            pack_cohesion_radius: self.pack_cohesion_radius,
            reactive_aggression_multiplier: self.reactive_aggression_multiplier,
        }
        .sanitized()
    }
}

impl From<BalanceProfile> for BalanceConfig {
    fn from(profile: BalanceProfile) -> Self {
        Self {
            stalking_min_distance: profile.stalking_min_distance,
            stalking_max_distance: profile.stalking_max_distance,
            hunting_aggro_distance: profile.hunting_aggro_distance,
            hunting_prediction_lead: profile.hunting_prediction_lead,
            territorial_radius: profile.territorial_radius,
            lure_cooldown: profile.lure_cooldown,
            pack_cohesion_radius: profile.pack_cohesion_radius,
            reactive_aggression_multiplier: profile.reactive_aggression_multiplier,
        }
    }
}
