use std::collections::{BTreeMap, BTreeSet};

use instinct_bt::{BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    AgentId, BalanceProfile, Blackboard, Commons, Species, Territory, TickContext, WorldView,
};
use instinct_sense::Sensors;
use instinct_species::{InstinctWorld, SpeciesRegistry};
use instinct_tools::{tags, NullTraceSink, TraceEvent, TraceSink};
use tracing::{debug, warn};

use crate::{CoordinatorError, RuntimeConfig};

/// Everything one attached agent keeps between ticks.
struct AgentState<W>
where
    W: InstinctWorld + 'static,
{
    agent: W::Agent,
    species: Species,
    sensors: Sensors,
    blackboard: Blackboard,
    tree: BehaviorTree<W>,
    active_action: Option<&'static str>,
}

/// Counts from one [`Coordinator::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub tick: u64,
    pub ticked: usize,
    /// Agents whose root reported `Failure`. Always zero for well-formed trees.
    pub failed: usize,
    pub skipped: usize,
    pub detached: usize,
}

/// Registry of attached agents, keyed by stable id.
///
/// The coordinator owns each agent's sensors, blackboard and tree, plus the
/// [`Commons`] shared by all of them. Per-agent ticks run in this order: scan, species
/// host queries, species stimulus hook, timer decay, tree evaluation.
pub struct Coordinator<W>
where
    W: InstinctWorld + 'static,
{
    registry: SpeciesRegistry<W>,
    profile: BalanceProfile,
    commons: Commons,
    agents: BTreeMap<u64, AgentState<W>>,
    /// Agents already evaluated during the current tick.
    evaluated: BTreeSet<u64>,
    clock: TickContext,
    sink: Box<dyn TraceSink>,
}

impl<W> Coordinator<W>
where
    W: InstinctWorld + 'static,
{
    pub fn new(registry: SpeciesRegistry<W>, profile: BalanceProfile, commons: Commons) -> Self {
        Self {
            registry,
            profile: profile.sanitized(),
            commons,
            agents: BTreeMap::new(),
            evaluated: BTreeSet::new(),
            clock: TickContext::new(0, 0.0, 0.0, 0),
            sink: Box::new(NullTraceSink),
        }
    }

    /// Built-in species modules configured from `config`.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            SpeciesRegistry::with_builtin(),
            config.profile(),
            Commons::new(config.heat_field, config.anchor_retry_seconds),
        )
        .with_seed(config.seed)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.clock.seed = seed;
        self
    }

    pub fn with_trace_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn profile(&self) -> &BalanceProfile {
        &self.profile
    }

    /// Swap the balance profile for every attached agent.
    ///
    /// Trees and memories are kept; only distances, timings and territory radii change.
    pub fn set_profile(&mut self, profile: BalanceProfile) {
        self.profile = profile.sanitized();
        for state in self.agents.values_mut() {
            state
                .blackboard
                .set_territory_radius(self.profile.territorial_radius);
        }
        debug!(agents = self.agents.len(), "balance profile replaced");
    }

    pub fn registry_mut(&mut self) -> &mut SpeciesRegistry<W> {
        &mut self.registry
    }

    pub fn commons(&self) -> &Commons {
        &self.commons
    }

    pub fn commons_mut(&mut self) -> &mut Commons {
        &mut self.commons
    }

    /// Timing of the tick currently being evaluated.
    pub fn clock(&self) -> TickContext {
        self.clock
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn is_attached(&self, agent: W::Agent) -> bool {
        self.agents.contains_key(&agent.stable_id())
    }

    pub fn attached(&self) -> impl Iterator<Item = W::Agent> + '_ {
        self.agents.values().map(|state| state.agent)
    }

    pub fn blackboard(&self, agent: W::Agent) -> Option<&Blackboard> {
        self.agents
            .get(&agent.stable_id())
            .map(|state| &state.blackboard)
    }

    pub fn blackboard_mut(&mut self, agent: W::Agent) -> Option<&mut Blackboard> {
        self.agents
            .get_mut(&agent.stable_id())
            .map(|state| &mut state.blackboard)
    }

    /// Label of the action that last committed movement for `agent`.
    pub fn active_action(&self, agent: W::Agent) -> Option<&'static str> {
        self.agents
            .get(&agent.stable_id())
            .and_then(|state| state.active_action)
    }

    /// Build perception, memory and tree for `agent` from its species module.
    ///
    /// The territory is centered where the agent stands at attach time.
    pub fn attach(&mut self, world: &W, agent: W::Agent) -> Result<(), CoordinatorError> {
        let id = agent.stable_id();
        if self.agents.contains_key(&id) {
            return Err(CoordinatorError::AlreadyAttached(id));
        }
        let species = world
            .species(agent)
            .ok_or(CoordinatorError::UnknownAgent(id))?;
        let pose = world.pose(agent).ok_or(CoordinatorError::MissingPose(id))?;

        let module = self.registry.module(species);
        let mut blackboard = Blackboard::new(Territory::new(
            pose.position,
            self.profile.territorial_radius,
        ));
        module.install_facts(&mut blackboard);
        let state = AgentState {
            agent,
            species,
            sensors: Sensors::new(module.interest()),
            blackboard,
            tree: module.build_tree(),
            active_action: None,
        };

        debug!(
            agent = id,
            species = species.as_str(),
            tree = state.tree.species().as_str(),
            "agent attached"
        );
        self.sink.emit(
            TraceEvent::new(self.clock.tick, tags::ATTACH)
                .with_agent(id)
                .with_detail(species.as_str()),
        );
        self.agents.insert(id, state);
        Ok(())
    }

    pub fn detach(&mut self, agent: W::Agent) -> Result<(), CoordinatorError> {
        let id = agent.stable_id();
        if self.dispose(id) {
            Ok(())
        } else {
            Err(CoordinatorError::UnknownAgent(id))
        }
    }

    fn dispose(&mut self, id: u64) -> bool {
        if self.agents.remove(&id).is_none() {
            return false;
        }
        self.evaluated.remove(&id);
        debug!(agent = id, "agent detached");
        self.sink
            .emit(TraceEvent::new(self.clock.tick, tags::DETACH).with_agent(id));
        true
    }

    /// Evaluate one agent for the current tick, attaching it first if needed.
    ///
    /// Ticking several agents within one tick shares a single decay of the commons.
    /// Ticking an agent that already ran this tick closes the tick first, so a host
    /// driving agents one call at a time still decays timers on every call.
    pub fn tick(
        &mut self,
        world: &mut W,
        agent: W::Agent,
        dt: f32,
    ) -> Result<BtStatus, CoordinatorError> {
        let id = agent.stable_id();
        if !self.agents.contains_key(&id) {
            self.attach(world, agent)?;
        }
        if !self.evaluated.insert(id) {
            self.finish_tick();
            self.evaluated.insert(id);
        }
        self.clock.dt_seconds = dt;
        let clock = self.clock;

        let Some(pose) = world.pose(agent) else {
            warn!(agent = id, "attached agent lost its pose");
            return Err(CoordinatorError::MissingPose(id));
        };

        let Self {
            registry,
            profile,
            commons,
            agents,
            sink,
            ..
        } = self;
        let state = agents
            .get_mut(&id)
            .ok_or(CoordinatorError::UnknownAgent(id))?;
        let dt = clock.dt();

        let report = state.sensors.scan(
            &*world,
            agent,
            pose,
            &mut state.blackboard,
            profile,
            dt,
        );
        let module = registry.module(state.species);
        module.on_observe(&*world, agent, &clock, &mut state.blackboard);
        module.on_scan(&clock, &report, &mut state.blackboard, commons);
        state.blackboard.advance_timers(clock.tick, dt);
        commons.advance(clock.tick, dt);

        let mut ctx = EvalContext::new(
            clock,
            agent,
            pose,
            state.species,
            world,
            &mut state.blackboard,
            commons,
            profile,
        );
        let status = state.tree.tick(&mut ctx);
        let action = ctx.active_action();

        if let Some(label) = action {
            if state.active_action != Some(label) {
                debug!(
                    agent = id,
                    species = state.species.as_str(),
                    from = state.active_action.unwrap_or("-"),
                    to = label,
                    "active action changed"
                );
                sink.emit(
                    TraceEvent::new(clock.tick, tags::ACTION)
                        .with_agent(id)
                        .with_detail(label),
                );
                state.active_action = Some(label);
            }
        }
        if status == BtStatus::Failure {
            warn!(
                agent = id,
                species = state.species.as_str(),
                "root reported failure"
            );
            sink.emit(TraceEvent::new(clock.tick, tags::ROOT_FAILURE).with_agent(id));
        }
        Ok(status)
    }

    /// Close the current tick; the next [`Coordinator::tick`] starts a new one.
    pub fn finish_tick(&mut self) {
        self.evaluated.clear();
        self.clock = self.clock.next(self.clock.dt_seconds);
    }

    /// Tick every live agent once, dispose of agents the host no longer reports, and
    /// close the tick.
    ///
    /// One agent's error never stops the sweep.
    pub fn step(&mut self, world: &mut W, dt: f32) -> StepSummary {
        let mut summary = StepSummary {
            tick: self.clock.tick,
            ..StepSummary::default()
        };

        let mut live = world.agents();
        live.sort();
        live.dedup();
        let live_ids = live
            .iter()
            .map(|agent| agent.stable_id())
            .collect::<BTreeSet<_>>();
        let stale = self
            .agents
            .keys()
            .copied()
            .filter(|id| !live_ids.contains(id))
            .collect::<Vec<_>>();
        for id in stale {
            if self.dispose(id) {
                summary.detached += 1;
            }
        }

        self.clock.dt_seconds = dt;
        for agent in live {
            match self.tick(world, agent, dt) {
                Ok(status) => {
                    summary.ticked += 1;
                    if status == BtStatus::Failure {
                        summary.failed += 1;
                    }
                }
                Err(err) => {
                    debug!(agent = err.agent(), error = %err, "agent skipped this tick");
                    self.sink.emit(
                        TraceEvent::new(summary.tick, tags::TICK_ERROR)
                            .with_agent(err.agent())
                            .with_detail(err.to_string()),
                    );
                    summary.skipped += 1;
                }
            }
        }

        self.finish_tick();
        summary
    }
}
