use std::collections::BTreeMap;

use crate::{AnchorCache, HeatField, HeatFieldConfig, PackSignals, TargetId};

/// State shared by every agent of one simulation.
///
/// Owned by a single coordinator and advanced once per tick before any agent is
/// evaluated. Agents read and write it sequentially; evaluating agents in parallel
/// would need this split per worker or placed behind a lock.
#[derive(Debug, Clone, Default)]
pub struct Commons {
    pub heat: HeatField,
    pub anchors: AnchorCache,
    pub packs: PackSignals,
    stimulus_claims: BTreeMap<TargetId, u64>,
}

impl Commons {
    pub fn new(heat: HeatFieldConfig, anchor_retry_seconds: f32) -> Self {
        Self {
            heat: HeatField::new(heat),
            anchors: AnchorCache::new(anchor_retry_seconds),
            packs: PackSignals::new(),
            stimulus_claims: BTreeMap::new(),
        }
    }

    /// Decay shared fields for `tick`. Repeated calls within one tick are no-ops.
    pub fn advance(&mut self, tick: u64, dt: f32) -> bool {
        self.heat.advance(tick, dt)
    }

    /// Claim the right to write `target`'s stimuli into shared fields for `tick`.
    ///
    /// Several agents observe the same target; only the first claim per tick wins so
    /// one footstep heats the field once.
    pub fn claim_stimulus(&mut self, target: TargetId, tick: u64) -> bool {
        match self.stimulus_claims.insert(target, tick) {
            Some(previous) if previous >= tick => {
                self.stimulus_claims.insert(target, previous);
                false
            }
            _ => true,
        }
    }

    /// Drop claims for targets that no longer exist.
    pub fn forget_target(&mut self, target: TargetId) {
        self.stimulus_claims.remove(&target);
    }
}
