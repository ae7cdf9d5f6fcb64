use crate::{rng, AgentId, SplitMix64};

/// Per-step timing handed to every agent evaluated during that step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Monotonic step index; decay guards key off this.
    pub tick: u64,
    pub dt_seconds: f32,
    /// Simulation clock at the start of this step.
    pub time_seconds: f32,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32, time_seconds: f32, seed: u64) -> Self {
        Self {
            tick,
            dt_seconds,
            time_seconds,
            seed,
        }
    }

    /// Elapsed seconds, never negative.
    pub fn dt(&self) -> f32 {
        if self.dt_seconds.is_finite() {
            self.dt_seconds.max(0.0)
        } else {
            0.0
        }
    }

    /// The context for the step after this one.
    pub fn next(&self, dt_seconds: f32) -> Self {
        Self {
            tick: self.tick + 1,
            dt_seconds,
            time_seconds: self.time_seconds + self.dt(),
            seed: self.seed,
        }
    }

    pub fn rng_for_agent<A: AgentId>(&self, agent: A, stream: u64) -> SplitMix64 {
        let seed = rng::derive_seed(self.seed ^ self.tick, agent.stable_id(), stream);
        SplitMix64::new(seed)
    }
}
