//! Instincts for creatures without a dedicated module.
//!
//! The tree mirrors [`instinct_core::Blackboard::mode`]: territory defense, pack swarm,
//! hunt, lure, stalk, and a reactive patrol, followed by the idle leaf.

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtNode, BtStatus, EvalContext};
use instinct_core::{clamp01, lerp, DeterministicRng, Species, Vec3};
use instinct_nav::MoveRequest;

use crate::steer::{self, move_or_fail, move_to, spread};
use crate::{InstinctWorld, SpeciesModule};

/// Name of the world anchor the pack keeps away from.
pub const SHIP_ANCHOR: &str = "ship";
pub const SHIP_AVOIDANCE_RADIUS: f32 = 18.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericModule;

impl<W> SpeciesModule<W> for GenericModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Generic
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        BehaviorTree::new(Species::Generic, default_tree())
    }
}

/// The default priority tree. Other modules may reuse its branches.
pub fn default_tree<W>() -> Box<dyn BtNode<W>>
where
    W: InstinctWorld + 'static,
{
    selector(
        "Root",
        vec![
            sequence(
                "TerritorialSequence",
                vec![
                    condition("PlayerInsideTerritory", player_inside_territory),
                    action("TerritorialAction", territorial),
                ],
            ),
            sequence(
                "PackSequence",
                vec![
                    condition("ShouldSwarm", should_swarm),
                    action("PackAction", pack),
                ],
            ),
            sequence(
                "HuntSequence",
                vec![
                    condition("ShouldHunt", should_hunt),
                    action("HuntAction", hunt),
                ],
            ),
            sequence(
                "LureSequence",
                vec![
                    condition("ShouldLure", should_lure),
                    action("LureAction", lure),
                ],
            ),
            sequence(
                "StalkSequence",
                vec![
                    condition("ShouldStalk", should_stalk),
                    action("StalkAction", stalk),
                ],
            ),
            action("Reactive", reactive),
            action("Idle", steer::idle),
        ],
    )
}

pub fn player_inside_territory<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.player_inside_territory(ctx.position())
}

pub fn should_swarm<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.should_swarm()
}

pub fn should_hunt<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.should_hunt(ctx.profile)
}

pub fn should_lure<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.should_lure(ctx.profile)
}

pub fn should_stalk<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.should_stalk(ctx.profile)
}

/// Chase an intruder inside the territory, otherwise walk back to its center.
pub fn territorial<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let player = ctx.blackboard.player.last_known_position;
    let inside = ctx.blackboard.player_inside_territory(ctx.position());
    let chase = inside && player.is_known();
    let target = if chase {
        player
    } else {
        ctx.blackboard.territory().center
    };

    let radius = ctx.profile.territorial_radius;
    let (speed, accel, stopping) = if chase {
        (7.0, 14.0, 0.35)
    } else {
        (3.5, 8.0, 1.25)
    };
    let request = MoveRequest::new(target, radius * 0.5, radius * 2.5, speed)
        .acceleration(accel)
        .stopping_distance(stopping);
    move_or_fail(ctx, "Territorial", request)
}

/// Flock with nearby allies toward the target (or the pack center), steering clear
/// of the ship anchor.
pub fn pack<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let allies = &ctx.blackboard.pack.allies;
    if allies.is_empty() {
        return BtStatus::Failure;
    }

    let position = ctx.position();
    let mut separation = Vec3::ZERO;
    let mut alignment = Vec3::ZERO;
    let mut cohesion = Vec3::ZERO;
    for ally in allies {
        let to_ally = ally.position - position;
        separation -= to_ally / to_ally.length_squared().max(0.1);
        alignment += ally.forward;
        cohesion += ally.position;
    }
    let count = allies.len() as f32;
    separation = separation / count;
    alignment = (alignment / count).normalized();
    cohesion = (cohesion / count - position).normalized();

    let avoidance = ship_avoidance(ctx);
    let player = ctx.blackboard.player.last_known_position;
    let mut target = if player.is_known() {
        player
    } else {
        ctx.blackboard.pack.center
    };
    if !target.is_known() {
        return BtStatus::Failure;
    }

    let cohesion_radius = ctx.profile.pack_cohesion_radius;
    let direction = (separation * 1.5 + alignment + cohesion + avoidance * 2.0).normalized();
    target += direction * (cohesion_radius * 0.5) + spread(ctx, cohesion_radius * 0.25);

    let request = MoveRequest::new(target, cohesion_radius, cohesion_radius * 2.5, 5.25)
        .acceleration(10.0)
        .stopping_distance(1.1)
        .allow_partial();
    move_or_fail(ctx, "Pack", request)
}

/// Push away from the ship anchor, weighted by proximity. Zero when unknown or far.
pub fn ship_avoidance<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> Vec3 {
    let now = ctx.now();
    let world = &*ctx.world;
    let Some(ship) = ctx
        .commons
        .anchors
        .resolve(SHIP_ANCHOR, now, |name| world.anchor(name))
    else {
        return Vec3::ZERO;
    };

    let to_ship = ship - ctx.position();
    let distance = to_ship.length();
    if distance >= SHIP_AVOIDANCE_RADIUS || distance <= 0.01 {
        return Vec3::ZERO;
    }
    let weight = 1.0 - clamp01(distance / SHIP_AVOIDANCE_RADIUS);
    -to_ship.normalized() * weight
}

/// Run at the predicted intercept; fall back to a spread point at the last sighting.
pub fn hunt<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let last = ctx.blackboard.player.last_known_position;
    if !last.is_known() {
        return BtStatus::Failure;
    }

    let budget = ctx.profile.hunt_engage_distance();
    let direction = (last - ctx.position()).normalized();
    let predicted = last + direction * ctx.profile.hunting_prediction_lead;
    let intercept = MoveRequest::new(predicted, 6.0, budget, 7.5)
        .acceleration(18.0)
        .stopping_distance(0.4);
    if move_to(ctx, "Hunt", intercept) {
        return BtStatus::Running;
    }

    let fallback = MoveRequest::new(last + spread(ctx, 3.0), 6.0, budget, 6.5)
        .acceleration(16.0)
        .stopping_distance(0.45);
    move_or_fail(ctx, "Hunt", fallback)
}

/// Wander a few meters to draw the target out. Restarts the lure cooldown even when
/// no path is found.
pub fn lure<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    ctx.blackboard.reset_lure_timer();

    let position = ctx.position();
    let anchor = position + ctx.rng(0x1u64).inside_unit_circle() * 4.0;
    let request = MoveRequest::new(anchor.with_y(position.y), 3.0, ctx.profile.territorial_radius, 2.75)
        .acceleration(6.0)
        .stopping_distance(0.75)
        .allow_partial();
    move_or_fail(ctx, "Lure", request)
}

/// Hold between the stalking distances, behind the target's last known position.
pub fn stalk<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let last = ctx.blackboard.player.last_known_position;
    if !last.is_known() {
        return BtStatus::Failure;
    }

    let profile = *ctx.profile;
    let to_player = last - ctx.position();
    let heading = to_player.normalized();
    let keep = if to_player.length() > profile.stalking_max_distance {
        profile.stalking_max_distance * 0.85
    } else {
        profile.stalking_min_distance
    };
    let desired = last - heading * keep + spread(ctx, profile.stalking_min_distance * 0.35);

    let request = MoveRequest::new(desired, 5.0, profile.stalking_max_distance * 1.15, 3.25)
        .acceleration(8.0)
        .stopping_distance(profile.stalking_min_distance * 0.45);
    move_or_fail(ctx, "Stalk", request)
}

/// Sweep ahead at a speed scaled by the threat score.
pub fn reactive<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let threat = ctx.blackboard.reactive_threat_score(ctx.profile);
    let speed = lerp(2.0, 6.0, clamp01(threat));

    let sweep = (ctx.now() * 0.25).sin() * 45.0;
    let heading = ctx.forward().flat().normalized();
    let heading = if heading == Vec3::ZERO {
        Vec3::FORWARD
    } else {
        heading
    };
    let target = ctx.position() + heading.rotate_y(sweep) * 3.0;

    let request = MoveRequest::new(target, 3.0, ctx.profile.territorial_radius, speed).allow_partial();
    move_or_fail(ctx, "Reactive", request)
}
