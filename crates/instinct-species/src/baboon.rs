//! Baboon hawk: nest-bound pack that mobs intruders together.
//!
//! Each hawk belongs to the pack gathered around its nest; the member with the lowest
//! stable id leads and posts attack and movement orders on [`PackSignals`] for the
//! others. Every move blends the hawk's own intent with separation, alignment and
//! cohesion among baboon allies.
//!
//! [`PackSignals`]: instinct_core::PackSignals

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    AgentId, AllySighting, Blackboard, BlockKey, DeterministicRng, FactBlock, LatchTimer,
    Species, TickContext, Vec3,
};
use instinct_nav::{MoveRequest, Navigator};

use crate::generic::{ship_avoidance, SHIP_ANCHOR};
use crate::steer::{self, move_or_fail, spread};
use crate::{InstinctWorld, SpeciesModule};

pub const BABOON_FACTS: BlockKey<BaboonFacts> = BlockKey::new(5);

/// Host anchor naming the shared baboon camp.
pub const BABOON_CAMP_ANCHOR: &str = "baboon_camp";
/// Baboon allies this close to the nest count as the same pack.
pub const PACK_RANGE: f32 = 8.0;
const NEST_ALERT_SECONDS: f32 = 4.5;
const SHIP_OVERRIDE_SECONDS: f32 = 4.0;
const LOOT_SEARCH_RADIUS: f32 = 7.0;
const SHIP_LOOT_RADIUS: f32 = 14.0;
const WAYPOINT_HOLD_SECONDS: f32 = 5.0;
const WAYPOINT_ATTEMPTS: usize = 6;
const WAYPOINT_STREAM: u64 = 0xBAB0;

#[derive(Debug, Clone, PartialEq)]
pub struct BaboonFacts {
    nest: Vec3,
    alert: LatchTimer,
    ship_override: LatchTimer,
    leader: bool,
    pack: Option<u64>,
    waypoint: Vec3,
    waypoint_timer: LatchTimer,
}

impl Default for BaboonFacts {
    fn default() -> Self {
        Self {
            nest: Vec3::UNKNOWN,
            alert: LatchTimer::new(),
            ship_override: LatchTimer::new(),
            leader: true,
            pack: None,
            waypoint: Vec3::UNKNOWN,
            waypoint_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for BaboonFacts {
    fn name(&self) -> &'static str {
        "baboon"
    }

    fn decay(&mut self, dt: f32) {
        self.alert.decay(dt);
        self.ship_override.decay(dt);
        if self.waypoint_timer.is_active() {
            self.waypoint_timer.decay(dt);
            if !self.waypoint_timer.is_active() {
                self.waypoint = Vec3::UNKNOWN;
            }
        }
    }
}

impl BaboonFacts {
    pub fn nest(&self) -> Vec3 {
        self.nest
    }

    /// Settle on a nest once; later calls keep the first one.
    pub fn ensure_nest(&mut self, nest: Vec3) {
        if !self.nest.is_known() && nest.is_known() {
            self.nest = nest;
        }
    }

    pub fn alert_active(&self) -> bool {
        self.alert.is_active()
    }

    pub fn raise_alert(&mut self, seconds: f32) {
        self.alert.latch(seconds);
    }

    pub fn ship_override(&self) -> bool {
        self.ship_override.is_active()
    }

    pub fn allow_ship_approach(&mut self, seconds: f32) {
        self.ship_override.latch(seconds);
    }

    pub fn is_leader(&self) -> bool {
        self.leader
    }

    /// Stable id of this hawk's pack leader, once leadership has been settled.
    pub fn pack(&self) -> Option<u64> {
        self.pack
    }

    /// Lowest id among `own` and the baboon allies gathered at the nest leads.
    pub fn settle_leadership(&mut self, own: u64, allies: &[AllySighting]) {
        let nest = self.nest;
        let leader = allies
            .iter()
            .filter(|ally| ally.species == Species::Baboon)
            .filter(|ally| !nest.is_known() || ally.position.distance(nest) <= PACK_RANGE)
            .map(|ally| ally.id)
            .fold(own, u64::min);
        self.leader = leader == own;
        self.pack = Some(leader);
    }

    fn hold_waypoint(&mut self, point: Vec3) {
        self.waypoint = point;
        self.waypoint_timer.latch(WAYPOINT_HOLD_SECONDS);
    }

    fn clear_waypoint(&mut self) {
        self.waypoint = Vec3::UNKNOWN;
        self.waypoint_timer.clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaboonModule;

impl<W> SpeciesModule<W> for BaboonModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Baboon
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(BABOON_FACTS, BaboonFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "BaboonRoot",
            vec![
                sequence(
                    "BaboonDefense",
                    vec![
                        condition("BaboonNestThreat", nest_threatened),
                        action("BaboonDefendNestAction", defend_nest),
                    ],
                ),
                sequence(
                    "BaboonStrike",
                    vec![
                        condition("BaboonPackReady", pack_ready_to_strike),
                        action("BaboonClusterStrikeAction", cluster_strike),
                    ],
                ),
                sequence(
                    "BaboonScavenge",
                    vec![
                        condition("BaboonShouldScavenge", should_scavenge),
                        action("BaboonScavengeAction", scavenge),
                    ],
                ),
                action("BaboonClusterPatrol", cluster_patrol),
                action("BaboonIdle", idle_near_nest),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Baboon, root)
    }

    /// Settle the nest on the camp anchor (or where the hawk stands) and elect the
    /// pack leader from this tick's allies.
    fn on_observe(
        &self,
        world: &W,
        agent: W::Agent,
        _tick: &TickContext,
        blackboard: &mut Blackboard,
    ) {
        let camp = world
            .anchor(BABOON_CAMP_ANCHOR)
            .filter(|p| p.is_known())
            .or_else(|| world.pose(agent).map(|pose| pose.position));
        let allies = blackboard.pack.allies.clone();
        if let Some(facts) = blackboard.block_mut(BABOON_FACTS) {
            if let Some(camp) = camp {
                facts.ensure_nest(camp);
            }
            facts.settle_leadership(agent.stable_id(), &allies);
        }
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b BaboonFacts> {
    ctx.blackboard.block(BABOON_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut BaboonFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(BABOON_FACTS).map(apply)
}

/// The settled nest, else the territory center.
fn nest<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> Vec3 {
    facts(ctx)
        .map(BaboonFacts::nest)
        .filter(|n| n.is_known())
        .unwrap_or_else(|| ctx.blackboard.territory().center)
}

fn packmates<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> usize {
    ctx.blackboard
        .pack
        .allies
        .iter()
        .filter(|ally| ally.species == Species::Baboon)
        .count()
}

pub fn nest_threatened<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    if facts(ctx).is_some_and(BaboonFacts::alert_active) {
        return true;
    }
    let player = &ctx.blackboard.player;
    if !player.has_known_position() {
        return false;
    }
    let from_nest = player.last_known_position.distance(nest(ctx));
    from_nest <= 9.0 || (player.visible && from_nest <= 15.0)
}

pub fn pack_ready_to_strike<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let player = &ctx.blackboard.player;
    if !player.visible && player.time_since_seen.seconds() > 3.0 {
        return false;
    }
    packmates(ctx) >= 2
}

pub fn should_scavenge<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let player = &ctx.blackboard.player;
    !player.visible && player.time_since_seen.seconds() > 2.5
}

/// Blend `desired` with flocking among baboon allies, ship avoidance and the
/// leader's standing movement order. Normalized.
pub fn cluster_vector<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, desired: Vec3) -> Vec3 {
    let direction = if desired.length_squared() < 0.01 {
        ctx.forward()
    } else {
        desired.normalized()
    };

    let position = ctx.position();
    let mut separation = Vec3::ZERO;
    let mut alignment = Vec3::ZERO;
    let mut cohesion = Vec3::ZERO;
    let mut count = 0usize;
    for ally in ctx.blackboard.pack.allies.iter().filter(|a| a.species == Species::Baboon) {
        let to_ally = ally.position - position;
        separation -= to_ally / to_ally.length_squared().max(0.1);
        alignment += ally.forward;
        cohesion += ally.position;
        count += 1;
    }
    if count > 0 {
        let n = count as f32;
        separation = separation / n;
        alignment = (alignment / n).normalized();
        cohesion = (cohesion / n - position).normalized();
    }

    let snapshot = facts(ctx).cloned();
    let avoidance = if snapshot.as_ref().is_some_and(BaboonFacts::ship_override) {
        Vec3::ZERO
    } else {
        ship_avoidance(ctx)
    };
    let leader_move = snapshot
        .and_then(|f| f.pack())
        .and_then(|pack| ctx.commons.packs.move_direction(pack, ctx.now()))
        .unwrap_or(Vec3::ZERO);

    let blended = direction
        + separation * 1.15
        + alignment * 0.5
        + cohesion * 0.65
        + avoidance * 2.0
        + leader_move * 0.8;
    if blended.length_squared() > 0.01 {
        blended.normalized()
    } else {
        direction.normalized()
    }
}

/// A walkable point between `min` and `max` meters from `origin`; `origin` when
/// nothing nearby samples.
fn select_waypoint(
    navigator: &dyn Navigator,
    rng: &mut impl DeterministicRng,
    origin: Vec3,
    min: f32,
    max: f32,
) -> Vec3 {
    let min = min.max(0.0);
    let max = max.max(min + 0.1);
    for _ in 0..WAYPOINT_ATTEMPTS {
        let offset = rng.inside_unit_circle();
        if offset.length_squared() < 0.01 {
            continue;
        }
        let guess = origin + offset.normalized() * rng.next_f32_range(min, max);
        if let Some(point) = navigator.sample_position(guess, 5.0) {
            return point;
        }
    }
    origin
}

/// The held waypoint around `origin`, or a fresh one once it is reached or stale.
fn waypoint<W: InstinctWorld>(
    ctx: &mut EvalContext<'_, W>,
    origin: Vec3,
    min: f32,
    max: f32,
) -> Vec3 {
    let held = facts(ctx).map_or(Vec3::UNKNOWN, |f| f.waypoint);
    if held.is_known() && ctx.position().distance(held) > 1.0 {
        return held;
    }
    let mut rng = ctx.rng(WAYPOINT_STREAM);
    let point = select_waypoint(ctx.world.navigator(), &mut rng, origin, min, max);
    update(ctx, |f| f.hold_waypoint(point));
    point
}

fn post_move<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, direction: Vec3, hold: f32) {
    let Some(pack) = facts(ctx).filter(|f| f.is_leader()).and_then(BaboonFacts::pack) else {
        return;
    };
    let now = ctx.now();
    ctx.commons.packs.post_move(pack, direction, now, hold);
}

fn post_attack<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, target: Vec3, hold: f32) {
    let Some(pack) = facts(ctx).filter(|f| f.is_leader()).and_then(BaboonFacts::pack) else {
        return;
    };
    let now = ctx.now();
    ctx.commons.packs.post_attack(pack, target, now, hold);
}

/// Put the hawk between the intruder and the nest.
pub fn defend_nest<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let nest = nest(ctx);
    if !nest.is_known() {
        return BtStatus::Failure;
    }
    let player = ctx.blackboard.player;
    let mut guard = nest;
    if player.has_known_position() {
        let to_player = player.last_known_position - nest;
        guard = if to_player.length_squared() > 0.01 {
            nest + to_player.normalized() * 3.5
        } else {
            nest + Vec3::FORWARD * 2.5
        };
    }

    let flock = cluster_vector(ctx, guard - ctx.position());
    let destination = guard + flock * 1.5 + spread(ctx, 1.4);
    let speed = if player.visible { 8.25 } else { 5.75 };
    let request = MoveRequest::new(destination, 4.5, 28.0, speed)
        .acceleration(13.0)
        .stopping_distance(0.55)
        .allow_partial();
    let status = move_or_fail(ctx, "BaboonDefendNest", request);
    if status == BtStatus::Running && player.visible {
        update(ctx, |f| f.raise_alert(NEST_ALERT_SECONDS));
        post_attack(ctx, player.last_known_position, 2.0);
        post_move(ctx, flock, 1.5);
    }
    status
}

/// Converge on the leader's target with the rest of the pack.
pub fn cluster_strike<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let now = ctx.now();
    let ordered = snapshot
        .pack()
        .and_then(|pack| ctx.commons.packs.attack_target(pack, now));
    let target = ordered.unwrap_or(ctx.blackboard.player.last_known_position);
    if !target.is_known() {
        return BtStatus::Failure;
    }
    if snapshot.is_leader() {
        post_attack(ctx, target, 2.75);
        let advance = target - ctx.position();
        post_move(ctx, advance, 1.5);
    }

    let cohesion = ctx.profile.pack_cohesion_radius;
    let flock = cluster_vector(ctx, target - ctx.position());
    let destination = target - flock * 1.35 + spread(ctx, cohesion * 0.3);
    let request = MoveRequest::new(destination, cohesion, ctx.profile.hunt_engage_distance(), 9.25)
        .acceleration(19.0)
        .stopping_distance(0.45)
        .allow_partial();
    move_or_fail(ctx, "BaboonClusterStrike", request)
}

/// Comb the ground around the nest for loot, and allow the ship when loot lies by it.
pub fn scavenge<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let nest = nest(ctx);
    if !nest.is_known() {
        return BtStatus::Failure;
    }
    let territory = ctx.profile.territorial_radius;
    let search = waypoint(ctx, nest, 4.0, territory * 0.8);
    let mut destination = search;

    if let Some(loot) = ctx.world.loot_near(search, LOOT_SEARCH_RADIUS) {
        destination = loot.position;
        let now = ctx.now();
        let world = &*ctx.world;
        let ship = ctx.commons.anchors.resolve(SHIP_ANCHOR, now, |name| world.anchor(name));
        if ship.is_some_and(|ship| ship.distance(destination) < SHIP_LOOT_RADIUS) {
            update(ctx, |f| f.allow_ship_approach(SHIP_OVERRIDE_SECONDS));
        }
        let heading = destination - ctx.position();
        post_move(ctx, heading, 1.25);
    }

    let request = MoveRequest::new(destination, 4.0, territory * 2.5, 5.75)
        .acceleration(10.0)
        .stopping_distance(0.6)
        .allow_partial();
    let status = move_or_fail(ctx, "BaboonScavenge", request);
    if status == BtStatus::Failure {
        update(ctx, BaboonFacts::clear_waypoint);
    }
    status
}

/// Roam the pack's ground in formation.
pub fn cluster_patrol<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let center = ctx.blackboard.pack.center;
    let anchor = if center.is_known() { center } else { nest(ctx) };
    if !anchor.is_known() {
        return BtStatus::Failure;
    }
    let cohesion = ctx.profile.pack_cohesion_radius;
    let mut point = waypoint(ctx, anchor, cohesion * 0.3, cohesion * 0.9);
    let flock = cluster_vector(ctx, point - ctx.position());
    point += flock * 1.1;

    let request = MoveRequest::new(point, cohesion, ctx.profile.territorial_radius * 1.5, 6.25)
        .acceleration(12.0)
        .stopping_distance(0.75)
        .allow_partial();
    let status = move_or_fail(ctx, "BaboonClusterPatrol", request);
    match status {
        BtStatus::Running => post_move(ctx, flock, 1.0),
        BtStatus::Failure => {
            update(ctx, BaboonFacts::clear_waypoint);
        }
        BtStatus::Success => {}
    }
    status
}

pub fn idle_near_nest<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let nest = nest(ctx);
    if !nest.is_known() {
        return BtStatus::Failure;
    }
    let perch = waypoint(ctx, nest, 0.5, 2.5);
    let request = MoveRequest::new(perch, 2.0, 12.0, 3.5)
        .acceleration(6.0)
        .stopping_distance(0.4)
        .allow_partial();
    move_or_fail(ctx, "BaboonIdle", request)
}
