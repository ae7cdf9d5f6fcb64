//! Blob: slow, omniscient, and parked on the way out.
//!
//! It knows where every living target is. Rather than chase at its crawl, it holds the
//! approach to whichever exit the targets are closest to, and only oozes after them
//! directly when no exit is known. Traps ahead of it are skirted sideways.

use instinct_bt::{
    action, condition, observing_condition, selector, sequence, BehaviorTree, BtStatus,
    EvalContext,
};
use instinct_core::{Blackboard, BlockKey, DeterministicRng, FactBlock, LatchTimer, Species, Vec3};
use instinct_nav::MoveRequest;
use instinct_sense::{HitTag, LayerMask, TargetState};

use crate::steer::{self, move_to};
use crate::{ExitSighting, InstinctWorld, SpeciesModule};

pub const BLOB_FACTS: BlockKey<BlobFacts> = BlockKey::new(6);

pub const HAZARD_LOOKAHEAD: f32 = 3.75;
const HAZARD_SIDESTEP: f32 = 3.5;
const HAZARD_HOLD_SECONDS: f32 = 3.5;
const INTERCEPT_HOLD_SECONDS: f32 = 5.0;
const AMBUSH_HOLD_SECONDS: f32 = 8.0;
/// Meters in front of an exit where the blob waits.
pub const EXIT_APPROACH_OFFSET: f32 = 3.0;
const LOST_TARGET_SECONDS: f32 = 4.0;
const ARRIVAL_DISTANCE: f32 = 1.25;
const CREEP_STREAM: u64 = 0xB10B;

#[derive(Debug, Clone, PartialEq)]
pub struct BlobFacts {
    hazard: Vec3,
    hazard_detour: Vec3,
    hazard_timer: LatchTimer,
    intercept: Vec3,
    intercept_timer: LatchTimer,
    ambush: Vec3,
    ambush_timer: LatchTimer,
}

impl Default for BlobFacts {
    fn default() -> Self {
        Self {
            hazard: Vec3::UNKNOWN,
            hazard_detour: Vec3::UNKNOWN,
            hazard_timer: LatchTimer::new(),
            intercept: Vec3::UNKNOWN,
            intercept_timer: LatchTimer::new(),
            ambush: Vec3::UNKNOWN,
            ambush_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for BlobFacts {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn decay(&mut self, dt: f32) {
        if self.hazard_timer.is_active() {
            self.hazard_timer.decay(dt);
            if !self.hazard_timer.is_active() {
                self.clear_hazard();
            }
        }
        if self.intercept_timer.is_active() {
            self.intercept_timer.decay(dt);
            if !self.intercept_timer.is_active() {
                self.clear_intercept();
            }
        }
        if self.ambush_timer.is_active() {
            self.ambush_timer.decay(dt);
            if !self.ambush_timer.is_active() {
                self.clear_ambush();
            }
        }
    }
}

impl BlobFacts {
    pub fn hazard_active(&self) -> bool {
        self.hazard_timer.is_active() && self.hazard_detour.is_known()
    }

    pub fn hazard(&self) -> Vec3 {
        self.hazard
    }

    pub fn hazard_detour(&self) -> Vec3 {
        self.hazard_detour
    }

    pub fn set_hazard(&mut self, hazard: Vec3, detour: Vec3) {
        self.hazard = hazard;
        self.hazard_detour = detour;
        self.hazard_timer.latch(HAZARD_HOLD_SECONDS);
    }

    pub fn clear_hazard(&mut self) {
        self.hazard = Vec3::UNKNOWN;
        self.hazard_detour = Vec3::UNKNOWN;
        self.hazard_timer.clear();
    }

    pub fn intercept(&self) -> Vec3 {
        self.intercept
    }

    pub fn set_intercept(&mut self, point: Vec3) {
        self.intercept = point;
        self.intercept_timer.latch(INTERCEPT_HOLD_SECONDS);
    }

    pub fn clear_intercept(&mut self) {
        self.intercept = Vec3::UNKNOWN;
        self.intercept_timer.clear();
    }

    pub fn ambush(&self) -> Vec3 {
        self.ambush
    }

    pub fn set_ambush(&mut self, point: Vec3) {
        self.ambush = point;
        self.ambush_timer.latch(AMBUSH_HOLD_SECONDS);
    }

    pub fn clear_ambush(&mut self) {
        self.ambush = Vec3::UNKNOWN;
        self.ambush_timer.clear();
    }
}

/// Approach point of the exit closest to any living target; the main exit's when
/// nobody is alive. `None` without exits.
pub fn preferred_exit_approach(exits: &[ExitSighting], targets: &[TargetState]) -> Option<Vec3> {
    let valid = exits.iter().filter(|exit| exit.position.is_known());
    let mut best: Option<(f32, &ExitSighting)> = None;
    for target in targets.iter().filter(|t| t.alive && t.position.is_known()) {
        for exit in valid.clone() {
            let distance = target.position.distance(exit.position);
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, exit));
            }
        }
    }
    let exit = match best {
        Some((_, exit)) => exit,
        None => valid.clone().next()?,
    };
    Some(approach_point(exit))
}

fn approach_point(exit: &ExitSighting) -> Vec3 {
    let forward = exit.forward.flat();
    let forward = if forward.length_squared() < 0.01 {
        Vec3::FORWARD
    } else {
        forward.normalized()
    };
    exit.position - forward * EXIT_APPROACH_OFFSET
}

/// Position of the living target nearest `origin`.
pub fn nearest_living(targets: &[TargetState], origin: Vec3) -> Option<Vec3> {
    targets
        .iter()
        .filter(|t| t.alive && t.position.is_known())
        .map(|t| t.position)
        .min_by(|a, b| origin.distance(*a).total_cmp(&origin.distance(*b)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlobModule;

impl<W> SpeciesModule<W> for BlobModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Blob
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(BLOB_FACTS, BlobFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "BlobRoot",
            vec![
                sequence(
                    "BlobHazardSequence",
                    vec![
                        observing_condition("BlobHazardDetected", detect_hazard),
                        action("BlobHazardReroute", reroute_hazard),
                    ],
                ),
                sequence(
                    "BlobAmbushSequence",
                    vec![
                        condition("BlobShouldAmbush", should_ambush),
                        action("BlobAmbushMove", move_to_ambush),
                    ],
                ),
                selector(
                    "BlobPursuit",
                    vec![
                        sequence(
                            "BlobFlowIntercept",
                            vec![
                                action("BlobUpdateIntercept", update_intercept),
                                action("BlobMoveIntercept", move_to_intercept),
                            ],
                        ),
                        action("BlobPursueDirect", pursue_nearest),
                    ],
                ),
                action("BlobIdle", idle_creep),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Blob, root)
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b BlobFacts> {
    ctx.blackboard.block(BLOB_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut BlobFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(BLOB_FACTS).map(apply)
}

/// A held detour, or a trap along the current heading. Records the detour it picks.
pub fn detect_hazard<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> bool {
    if facts(ctx).is_some_and(BlobFacts::hazard_active) {
        return true;
    }
    let Some(actuator) = ctx.world.actuator(ctx.agent) else {
        return false;
    };
    let mut heading = actuator.velocity().flat();
    if heading.length_squared() < 0.1 {
        heading = ctx.forward().flat();
    }
    if heading.length_squared() < 0.1 {
        return false;
    }
    let heading = heading.normalized();

    let origin = ctx.position() + Vec3::UP * 0.2;
    let Some(hit) = ctx.world.raycast(origin, heading, HAZARD_LOOKAHEAD, LayerMask::HAZARD) else {
        return false;
    };
    if hit.tag != HitTag::Hazard {
        return false;
    }

    let lateral = Vec3::new(heading.z, 0.0, -heading.x);
    let navigator = ctx.world.navigator();
    let Some(detour) = navigator
        .sample_position(origin + lateral * HAZARD_SIDESTEP, 4.0)
        .or_else(|| navigator.sample_position(origin - lateral * HAZARD_SIDESTEP, 4.0))
    else {
        return false;
    };
    update(ctx, |f| f.set_hazard(hit.point, detour));
    true
}

pub fn should_ambush<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let player = &ctx.blackboard.player;
    player.distance > ctx.profile.territorial_radius * 1.25
        || player.time_since_seen.seconds() > LOST_TARGET_SECONDS
}

pub fn reroute_hazard<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let target = facts(ctx).map_or(Vec3::UNKNOWN, BlobFacts::hazard_detour);
    if !target.is_known() {
        update(ctx, BlobFacts::clear_hazard);
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) < 0.9 {
        update(ctx, BlobFacts::clear_hazard);
        ctx.set_active_action("BlobHazardCleared");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(target, 1.25, 18.0, 2.2)
        .acceleration(4.5)
        .stopping_distance(0.35)
        .allow_partial();
    if move_to(ctx, "BlobAvoidHazard", request) {
        return BtStatus::Running;
    }
    update(ctx, BlobFacts::clear_hazard);
    BtStatus::Failure
}

fn exit_approach<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> Option<Vec3> {
    let approach = preferred_exit_approach(&ctx.world.exits(), &ctx.world.targets())?;
    Some(
        ctx.world
            .navigator()
            .sample_position(approach, 3.0)
            .unwrap_or(approach),
    )
}

/// Settle in front of the exit the targets will most likely leave through.
pub fn move_to_ambush<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let mut anchor = facts(ctx).map_or(Vec3::UNKNOWN, BlobFacts::ambush);
    if !anchor.is_known() {
        let Some(approach) = exit_approach(ctx) else {
            return BtStatus::Failure;
        };
        update(ctx, |f| f.set_ambush(approach));
        anchor = approach;
    }

    if ctx.position().distance(anchor) < ARRIVAL_DISTANCE {
        ctx.set_active_action("BlobAmbushHold");
        return BtStatus::Success;
    }
    let budget = ctx.profile.territorial_radius * 3.0;
    let request = MoveRequest::new(anchor, 2.5, budget, 1.8)
        .acceleration(4.0)
        .stopping_distance(0.4)
        .allow_partial();
    if move_to(ctx, "BlobAmbush", request) {
        return BtStatus::Running;
    }
    update(ctx, BlobFacts::clear_ambush);
    BtStatus::Failure
}

pub fn update_intercept<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    match exit_approach(ctx) {
        Some(point) => {
            update(ctx, |f| f.set_intercept(point));
            BtStatus::Success
        }
        None => {
            update(ctx, BlobFacts::clear_intercept);
            BtStatus::Failure
        }
    }
}

pub fn move_to_intercept<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let target = facts(ctx).map_or(Vec3::UNKNOWN, BlobFacts::intercept);
    if !target.is_known() {
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) < ARRIVAL_DISTANCE {
        ctx.set_active_action("BlobBlockingExit");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(target, 3.0, 120.0, 2.9)
        .acceleration(6.0)
        .stopping_distance(0.35)
        .allow_partial();
    if move_to(ctx, "BlobIntercept", request) {
        return BtStatus::Running;
    }
    update(ctx, BlobFacts::clear_intercept);
    BtStatus::Failure
}

/// Ooze straight at the nearest living target, seen or not.
pub fn pursue_nearest<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(target) = nearest_living(&ctx.world.targets(), ctx.position()) else {
        return BtStatus::Failure;
    };
    let request = MoveRequest::new(target, 2.5, 160.0, 3.4)
        .acceleration(7.0)
        .stopping_distance(0.2)
        .allow_partial();
    steer::move_or_fail(ctx, "BlobPursue", request)
}

pub fn idle_creep<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let mut rng = ctx.rng(CREEP_STREAM);
    let mut offset = rng.inside_unit_circle();
    if offset.length_squared() < 1e-4 {
        offset = Vec3::FORWARD;
    }
    let target = ctx.position() + offset.normalized() * rng.next_f32_range(0.5, 2.0);
    let request = MoveRequest::new(target, 1.5, 8.0, 1.2)
        .acceleration(3.0)
        .stopping_distance(0.3)
        .allow_partial();
    steer::move_or_fail(ctx, "BlobIdle", request)
}
