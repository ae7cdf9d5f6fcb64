use instinct_core::{
    AgentId, BalanceProfile, Blackboard, Commons, Pose, Species, SplitMix64, TickContext, Vec3,
    WorldView,
};

/// Everything one agent's tree can see and touch during one tick.
///
/// Built by the coordinator right before evaluation and dropped right after.
pub struct EvalContext<'a, W>
where
    W: WorldView,
{
    pub tick: TickContext,
    pub agent: W::Agent,
    /// Pose sampled at the start of the tick.
    pub pose: Pose,
    pub species: Species,
    pub world: &'a mut W,
    pub blackboard: &'a mut Blackboard,
    pub commons: &'a mut Commons,
    pub profile: &'a BalanceProfile,
    active_action: Option<&'static str>,
}

impl<'a, W> EvalContext<'a, W>
where
    W: WorldView,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tick: TickContext,
        agent: W::Agent,
        pose: Pose,
        species: Species,
        world: &'a mut W,
        blackboard: &'a mut Blackboard,
        commons: &'a mut Commons,
        profile: &'a BalanceProfile,
    ) -> Self {
        Self {
            tick,
            agent,
            pose,
            species,
            world,
            blackboard,
            commons,
            profile,
            active_action: None,
        }
    }

    pub fn dt(&self) -> f32 {
        self.tick.dt()
    }

    pub fn now(&self) -> f32 {
        self.tick.time_seconds
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.forward
    }

    pub fn stable_id(&self) -> u64 {
        self.agent.stable_id()
    }

    /// Deterministic random stream for this agent, tick and `stream`.
    pub fn rng(&self, stream: u64) -> SplitMix64 {
        self.tick.rng_for_agent(self.agent, stream)
    }

    /// Label of the action that committed movement this tick. Last writer wins.
    pub fn set_active_action(&mut self, label: &'static str) {
        self.active_action = Some(label);
    }

    pub fn active_action(&self) -> Option<&'static str> {
        self.active_action
    }
}
