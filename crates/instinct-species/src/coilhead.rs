//! Coilhead: frozen while watched, relentless otherwise.
//!
//! Observation is checked first every tick and latches a short buffer so a glance
//! away does not release it instantly. Unobserved, it chases the nearest engageable
//! target and breaches closed doors on the way.

use instinct_bt::{
    action, observing_condition, selector, sequence, BehaviorTree, BtStatus, EvalContext,
};
use instinct_core::{
    clamp01, Blackboard, BlockKey, DeterministicRng, FactBlock, LatchTimer, Species, Vec3,
};
use instinct_nav::{MoveRequest, NavPath};

use crate::steer::{self, halt, move_to};
use crate::{AnimationSignal, DoorId, DoorSighting, InstinctWorld, SpeciesModule};

pub const COILHEAD_FACTS: BlockKey<CoilheadFacts> = BlockKey::new(4);

pub const FREEZE_BUFFER_SECONDS: f32 = 0.35;
pub const AGGRO_MEMORY_SECONDS: f32 = 6.0;
pub const DOOR_PAUSE_SECONDS: f32 = 0.5;
/// Doors farther than this from every path segment are ignored.
pub const DOOR_PATH_TOLERANCE: f32 = 0.9;
const DOOR_CACHE_SECONDS: f32 = 2.5;
const CHASE_SAMPLE_RADIUS: f32 = 4.0;
const PATROL_RADIUS: f32 = 5.0;
const PATROL_REFRESH_SECONDS: f32 = 4.0;

/// A door the coilhead stopped to breach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorBreach {
    pub door: DoorId,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoilheadFacts {
    aggro_memory: LatchTimer,
    target: Vec3,
    frozen: bool,
    freeze_buffer: LatchTimer,
    observed_this_tick: bool,
    breach: Option<DoorBreach>,
    breach_hold: LatchTimer,
    door_cache: Vec<DoorSighting>,
    door_cache_age: Option<f32>,
    patrol_point: Vec3,
    patrol_timer: LatchTimer,
}

impl Default for CoilheadFacts {
    fn default() -> Self {
        Self {
            aggro_memory: LatchTimer::new(),
            target: Vec3::UNKNOWN,
            frozen: false,
            freeze_buffer: LatchTimer::new(),
            observed_this_tick: false,
            breach: None,
            breach_hold: LatchTimer::new(),
            door_cache: Vec::new(),
            door_cache_age: None,
            patrol_point: Vec3::UNKNOWN,
            patrol_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for CoilheadFacts {
    fn name(&self) -> &'static str {
        "coilhead"
    }

    fn decay(&mut self, dt: f32) {
        if !(dt >= 0.0) || !dt.is_finite() {
            return;
        }
        self.aggro_memory.decay(dt);
        if !self.aggro_memory.is_active() {
            self.target = Vec3::UNKNOWN;
        }

        self.observed_this_tick = false;
        self.freeze_buffer.decay(dt);
        self.breach_hold.decay(dt);

        if let Some(age) = self.door_cache_age.as_mut() {
            *age += dt;
        }
        if self.patrol_timer.is_active() {
            self.patrol_timer.decay(dt);
            if !self.patrol_timer.is_active() {
                self.patrol_point = Vec3::UNKNOWN;
            }
        }
    }
}

impl CoilheadFacts {
    pub fn has_aggro(&self) -> bool {
        self.aggro_memory.is_active()
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze_active(&self) -> bool {
        self.observed_this_tick || self.freeze_buffer.is_active()
    }

    pub fn mark_observed(&mut self) {
        self.observed_this_tick = true;
        self.freeze_buffer.latch(FREEZE_BUFFER_SECONDS);
    }

    pub fn set_target(&mut self, position: Vec3, memory: f32) {
        self.target = position;
        self.aggro_memory.latch(memory);
    }

    /// A remembered target that is still within aggro memory.
    pub fn remembered_target(&self) -> Option<Vec3> {
        (self.has_aggro() && self.target.is_known()).then_some(self.target)
    }

    pub fn breach(&self) -> Option<DoorBreach> {
        self.breach
    }

    pub fn breach_ready(&self) -> bool {
        self.breach.is_some() && !self.breach_hold.is_active()
    }

    fn begin_breach(&mut self, breach: DoorBreach, seconds: f32) {
        self.breach = Some(breach);
        self.breach_hold.latch(seconds);
    }

    fn finish_breach(&mut self) {
        self.breach = None;
        self.breach_hold.clear();
    }

    fn door_cache_stale(&self) -> bool {
        self.door_cache_age.map_or(true, |age| age >= DOOR_CACHE_SECONDS)
    }

    fn refresh_doors(&mut self, doors: Vec<DoorSighting>) {
        self.door_cache = doors;
        self.door_cache_age = Some(0.0);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoilheadModule;

impl<W> SpeciesModule<W> for CoilheadModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Coilhead
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(COILHEAD_FACTS, CoilheadFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "CoilheadRoot",
            vec![
                sequence(
                    "CoilheadObservation",
                    vec![
                        observing_condition("CoilheadObserved", being_observed),
                        action("CoilheadFreezeAction", freeze),
                    ],
                ),
                sequence(
                    "CoilheadChase",
                    vec![
                        observing_condition("CoilheadHasTarget", has_target),
                        action("CoilheadChaseAction", rapid_approach),
                    ],
                ),
                action("CoilheadPatrol", patrol),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Coilhead, root)
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b CoilheadFacts> {
    ctx.blackboard.block(COILHEAD_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut CoilheadFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(COILHEAD_FACTS).map(apply)
}

/// Observed now, or within the freeze buffer. Latches the buffer when observed.
pub fn being_observed<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> bool {
    let observed = ctx.world.is_observed(ctx.agent);
    if observed {
        update(ctx, CoilheadFacts::mark_observed);
    }
    observed || facts(ctx).is_some_and(CoilheadFacts::freeze_active)
}

/// Track the nearest engageable target, falling back to one still in aggro memory.
pub fn has_target<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> bool {
    select_target(ctx).is_some()
}

fn select_target<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> Option<Vec3> {
    let origin = ctx.position();
    let mut best: Option<(f32, Vec3)> = None;
    for target in ctx.world.targets() {
        if !target.alive || !ctx.world.is_targetable(ctx.agent, target.id) {
            continue;
        }
        let distance = origin.distance(target.position);
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, target.position));
        }
    }

    if let Some((_, position)) = best {
        update(ctx, |f| f.set_target(position, AGGRO_MEMORY_SECONDS));
        return Some(position);
    }
    facts(ctx).and_then(CoilheadFacts::remembered_target)
}

fn send_go<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) {
    if !facts(ctx).is_some_and(CoilheadFacts::frozen) {
        return;
    }
    ctx.world.signal(ctx.agent, AnimationSignal::Go);
    update(ctx, |f| f.frozen = false);
}

pub fn freeze<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    halt(ctx, 0.0);
    if !facts(ctx).is_some_and(CoilheadFacts::frozen) {
        ctx.world.signal(ctx.agent, AnimationSignal::Stop);
        update(ctx, |f| f.frozen = true);
    }
    ctx.set_active_action("CoilheadFreeze");
    BtStatus::Running
}

pub fn rapid_approach<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    if ctx.world.actuator(ctx.agent).is_none() {
        return BtStatus::Failure;
    }
    send_go(ctx);

    let Some(target) = select_target(ctx) else {
        return BtStatus::Failure;
    };
    if facts(ctx).is_some_and(|f| f.breach().is_some()) {
        return hold_at_door(ctx);
    }

    let Some(path) = build_chase_path(ctx, target) else {
        return BtStatus::Failure;
    };
    if let Some(breach) = closed_door_on_path(ctx, &path) {
        update(ctx, |f| f.begin_breach(breach, DOOR_PAUSE_SECONDS));
        return hold_at_door(ctx);
    }

    let enraged = facts(ctx).is_some_and(CoilheadFacts::has_aggro);
    let speed = if enraged { 18.0 } else { 9.0 };
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        let acceleration = actuator.settings().acceleration.max(speed * 2.1);
        actuator.set_speed(speed);
        actuator.set_acceleration(acceleration);
        actuator.set_auto_braking(false);
        actuator.set_stopping_distance(0.35);
        actuator.set_path(path);
    }
    ctx.set_active_action("CoilheadRapidApproach");
    BtStatus::Running
}

fn build_chase_path<W: InstinctWorld>(ctx: &EvalContext<'_, W>, target: Vec3) -> Option<NavPath> {
    let navigator = ctx.world.navigator();
    let destination = navigator.sample_position(target, CHASE_SAMPLE_RADIUS)?;
    navigator.find_path(ctx.position(), destination)
}

/// First cached door near the path. `None` when that door is open or unknown to the
/// host.
fn closed_door_on_path<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, path: &NavPath) -> Option<DoorBreach> {
    if path.points.len() < 2 {
        return None;
    }
    if facts(ctx).is_some_and(CoilheadFacts::door_cache_stale) {
        let doors = ctx.world.doors();
        update(ctx, |f| f.refresh_doors(doors));
    }

    let doors = facts(ctx).map(|f| f.door_cache.clone()).unwrap_or_default();
    for sighting in doors {
        if distance_to_path(&path.points, sighting.position) > DOOR_PATH_TOLERANCE {
            continue;
        }
        let Some(door) = ctx.world.door(sighting.id) else {
            continue;
        };
        if door.is_open() {
            return None;
        }
        return Some(DoorBreach {
            door: sighting.id,
            position: sighting.position,
        });
    }
    None
}

/// Stand still facing the door and force it open until the pause elapses.
fn hold_at_door<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(breach) = facts(ctx).and_then(CoilheadFacts::breach) else {
        return BtStatus::Failure;
    };
    halt(ctx, 0.0);

    let facing = (breach.position - ctx.position()).flat();
    if facing.length_squared() > 0.01 {
        ctx.world.face(ctx.agent, facing.normalized());
    }
    if let Some(door) = ctx.world.door_mut(breach.door) {
        door.force_open();
    }
    ctx.set_active_action("CoilheadDoorBreach");

    if facts(ctx).is_some_and(CoilheadFacts::breach_ready) {
        update(ctx, CoilheadFacts::finish_breach);
        return BtStatus::Success;
    }
    BtStatus::Running
}

/// Wander near the territory center, re-picking the spot every few seconds.
pub fn patrol<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    send_go(ctx);
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };

    let mut wander = snapshot.patrol_point;
    if !wander.is_known() {
        let center = ctx.blackboard.territory().center;
        let anchor = if center.is_known() { center } else { ctx.position() };
        let candidate = anchor + ctx.rng(0xc011).inside_unit_circle() * PATROL_RADIUS;
        let Some(sampled) = ctx.world.navigator().sample_position(candidate, PATROL_RADIUS) else {
            return BtStatus::Failure;
        };
        update(ctx, |f| {
            f.patrol_point = sampled;
            f.patrol_timer.latch(PATROL_REFRESH_SECONDS);
        });
        wander = sampled;
    }

    let request = MoveRequest::new(wander, PATROL_RADIUS, 0.0, 6.5)
        .acceleration(10.0)
        .stopping_distance(0.2)
        .allow_partial();
    if move_to(ctx, "CoilheadPatrol", request) {
        return BtStatus::Running;
    }
    update(ctx, |f| {
        f.patrol_point = Vec3::UNKNOWN;
        f.patrol_timer.clear();
    });
    BtStatus::Failure
}

/// Shortest distance from `point` to the polyline through `points`.
pub fn distance_to_path(points: &[Vec3], point: Vec3) -> f32 {
    points
        .windows(2)
        .map(|segment| point.distance(closest_point_on_segment(segment[0], segment[1], point)))
        .fold(f32::INFINITY, f32::min)
}

fn closest_point_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let denominator = ab.dot(ab);
    if denominator <= 1e-4 {
        return a;
    }
    a + ab * clamp01((point - a).dot(ab) / denominator)
}
