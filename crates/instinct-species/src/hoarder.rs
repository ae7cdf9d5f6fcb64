//! Hoarding bug: sweeps rings around its nest for loot and defends the pile.
//!
//! Searching walks an expanding ring of waypoints around the nest, skipping cells it
//! combed recently. A long fruitless sweep, or a target camping the nest, moves the
//! nest elsewhere. Intruders get a graded response: a warning at the nest, a buzzing
//! pass, and at close range a committed charge.

use std::collections::BTreeMap;

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    Blackboard, BlockKey, DeterministicRng, FactBlock, LatchTimer, PlayerFacts, Species,
    TickContext, Vec3,
};
use instinct_nav::{MoveRequest, Navigator};

use crate::steer::{self, move_to};
use crate::{InstinctWorld, LootSighting, SpeciesModule};

pub const HOARDER_FACTS: BlockKey<HoarderFacts> = BlockKey::new(8);

const SEARCH_OFFSETS: [Vec3; 8] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(0.707, 0.0, 0.707),
    Vec3::new(-0.707, 0.0, 0.707),
    Vec3::new(0.707, 0.0, -0.707),
    Vec3::new(-0.707, 0.0, -0.707),
];
const SEARCH_ATTEMPTS: usize = 48;
const SEARCH_CELL: f32 = 4.0;
/// Seconds before a combed cell is worth searching again.
pub const EXPLORED_CELL_SECONDS: f32 = 120.0;
/// Sweep radius past which an empty search gives up on the nest.
pub const MIGRATION_SCAN_RADIUS: f32 = 30.0;
pub const MIGRATION_COOLDOWN_SECONDS: f32 = 15.0;
const NEST_CAMP_DISTANCE: f32 = 6.0;
const ARRIVAL_DISTANCE: f32 = 1.15;
const LOOT_REACH: f32 = 1.25;
const IDLE_STREAM: u64 = 0x40A2;
const MIGRATION_STREAM: u64 = 0x40A3;

/// How hard the bug pushes back against an intruder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AggroLevel {
    #[default]
    None,
    Soft,
    Hard,
    Fatal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoarderFacts {
    nest: Vec3,
    layer: u32,
    offset_index: usize,
    explored: BTreeMap<(i32, i32), f32>,
    scan_max_radius: f32,
    items_located: u32,
    search_target: Vec3,
    target_loot: Option<LootSighting>,
    migration_target: Vec3,
    migration_cooldown: LatchTimer,
    aggro_grace: LatchTimer,
    idle_point: Vec3,
    idle_timer: LatchTimer,
}

impl Default for HoarderFacts {
    fn default() -> Self {
        Self {
            nest: Vec3::UNKNOWN,
            layer: 0,
            offset_index: 0,
            explored: BTreeMap::new(),
            scan_max_radius: 0.0,
            items_located: 0,
            search_target: Vec3::UNKNOWN,
            target_loot: None,
            migration_target: Vec3::UNKNOWN,
            migration_cooldown: LatchTimer::new(),
            aggro_grace: LatchTimer::new(),
            idle_point: Vec3::UNKNOWN,
            idle_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for HoarderFacts {
    fn name(&self) -> &'static str {
        "hoarder"
    }

    fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.aggro_grace.decay(dt);
        self.migration_cooldown.decay(dt);
        self.explored.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });
        if self.idle_timer.is_active() {
            self.idle_timer.decay(dt);
            if !self.idle_timer.is_active() {
                self.idle_point = Vec3::UNKNOWN;
            }
        }
    }
}

fn cell_of(position: Vec3) -> (i32, i32) {
    (
        (position.x / SEARCH_CELL).round() as i32,
        (position.z / SEARCH_CELL).round() as i32,
    )
}

impl HoarderFacts {
    pub fn nest(&self) -> Vec3 {
        self.nest
    }

    pub fn ensure_nest(&mut self, nest: Vec3) {
        if !self.nest.is_known() && nest.is_known() {
            self.nest = nest;
        }
    }

    pub fn items_located(&self) -> u32 {
        self.items_located
    }

    pub fn scan_max_radius(&self) -> f32 {
        self.scan_max_radius
    }

    pub fn is_explored(&self, position: Vec3) -> bool {
        self.explored.contains_key(&cell_of(position))
    }

    pub fn target_loot(&self) -> Option<LootSighting> {
        self.target_loot
    }

    pub fn migration_target(&self) -> Vec3 {
        self.migration_target
    }

    /// Next fresh waypoint on the expanding sweep around the nest. Restarts the sweep
    /// when every candidate is stale or off the navmesh.
    pub fn next_search_target(&mut self, navigator: &dyn Navigator) -> Option<Vec3> {
        if !self.nest.is_known() {
            return None;
        }
        for _ in 0..SEARCH_ATTEMPTS {
            if self.offset_index >= SEARCH_OFFSETS.len() {
                self.offset_index = 0;
                self.layer += 1;
            }
            let radius = ((self.layer + 1) as f32 * 6.0).max(5.0);
            let guess = self.nest + SEARCH_OFFSETS[self.offset_index] * radius;
            self.offset_index += 1;

            let Some(point) = navigator.sample_position(guess, 6.0) else {
                continue;
            };
            if self.is_explored(point) {
                continue;
            }
            self.explored.insert(cell_of(point), EXPLORED_CELL_SECONDS);
            self.scan_max_radius = self.scan_max_radius.max(self.nest.distance(point));
            return Some(point);
        }
        self.layer = 0;
        self.offset_index = 0;
        None
    }

    pub fn mark_item_located(&mut self, loot: LootSighting) {
        self.target_loot = Some(loot);
        self.items_located += 1;
        self.scan_max_radius = 0.0;
    }

    pub fn record_delivery(&mut self) {
        self.items_located = self.items_located.saturating_sub(1);
    }

    pub fn trigger_aggro(&mut self, seconds: f32) {
        self.aggro_grace.latch(seconds);
    }

    pub fn aggro_grace(&self) -> f32 {
        self.aggro_grace.remaining()
    }

    /// A long sweep that found nothing, once the previous move has settled.
    pub fn ready_to_migrate(&self) -> bool {
        self.scan_max_radius > MIGRATION_SCAN_RADIUS
            && self.items_located == 0
            && !self.migration_cooldown.is_active()
    }

    pub fn request_migration(&mut self, target: Vec3) {
        self.migration_target = target;
    }

    pub fn cancel_migration(&mut self) {
        self.migration_target = Vec3::UNKNOWN;
    }

    /// Adopt `nest` and restart the search from scratch.
    pub fn confirm_migration(&mut self, nest: Vec3) {
        self.nest = nest;
        self.layer = 0;
        self.offset_index = 0;
        self.scan_max_radius = 0.0;
        self.items_located = 0;
        self.explored.clear();
        self.search_target = Vec3::UNKNOWN;
        self.migration_target = Vec3::UNKNOWN;
        self.migration_cooldown.latch(MIGRATION_COOLDOWN_SECONDS);
    }

    pub fn aggro_level(&self, player: &PlayerFacts) -> AggroLevel {
        let near_nest = player.has_known_position()
            && self.nest.is_known()
            && player.last_known_position.distance(self.nest) < NEST_CAMP_DISTANCE;
        if player.visible {
            if player.distance <= 3.0 || (near_nest && player.distance <= 5.0) {
                return AggroLevel::Fatal;
            }
            if player.distance <= 8.0 {
                return AggroLevel::Hard;
            }
            if player.distance <= 12.0 {
                return AggroLevel::Soft;
            }
        }
        let grace = self.aggro_grace.remaining();
        if grace > 2.0 {
            AggroLevel::Hard
        } else if grace > 0.0 {
            AggroLevel::Soft
        } else {
            AggroLevel::None
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoarderModule;

impl<W> SpeciesModule<W> for HoarderModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Hoarder
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(HOARDER_FACTS, HoarderFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "HoarderRoot",
            vec![
                selector(
                    "HoarderCombat",
                    vec![
                        sequence(
                            "HoarderFatal",
                            vec![
                                condition("HoarderFatalAggro", fatal_aggro),
                                action("HoarderFatalAction", execute_fatal_aggro),
                            ],
                        ),
                        sequence(
                            "HoarderHard",
                            vec![
                                condition("HoarderHardAggro", hard_aggro),
                                action("HoarderHardAction", execute_hard_aggro),
                            ],
                        ),
                        sequence(
                            "HoarderSoft",
                            vec![
                                condition("HoarderSoftAggro", soft_aggro),
                                action("HoarderSoftAction", execute_soft_aggro),
                            ],
                        ),
                    ],
                ),
                selector(
                    "HoarderScavenge",
                    vec![
                        sequence(
                            "HoarderCarryHome",
                            vec![
                                condition("HoarderCarryingLoot", carrying_loot),
                                action("HoarderReturnNest", return_loot),
                            ],
                        ),
                        sequence(
                            "HoarderMigrate",
                            vec![
                                condition("HoarderNestThreat", nest_compromised),
                                action("HoarderMoveNest", migrate_nest),
                            ],
                        ),
                        action("HoarderSearch", search_for_items),
                    ],
                ),
                action("HoarderIdle", idle_around_nest),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Hoarder, root)
    }

    fn on_observe(
        &self,
        world: &W,
        agent: W::Agent,
        _tick: &TickContext,
        blackboard: &mut Blackboard,
    ) {
        let Some(pose) = world.pose(agent) else {
            return;
        };
        if let Some(facts) = blackboard.block_mut(HOARDER_FACTS) {
            facts.ensure_nest(pose.position);
        }
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b HoarderFacts> {
    ctx.blackboard.block(HOARDER_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut HoarderFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(HOARDER_FACTS).map(apply)
}

/// The settled nest, else the territory center.
fn nest<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> Vec3 {
    facts(ctx)
        .map(HoarderFacts::nest)
        .filter(|n| n.is_known())
        .unwrap_or_else(|| ctx.blackboard.territory().center)
}

fn aggro<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> AggroLevel {
    facts(ctx).map_or(AggroLevel::None, |f| f.aggro_level(&ctx.blackboard.player))
}

pub fn fatal_aggro<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    aggro(ctx) >= AggroLevel::Fatal
}

pub fn hard_aggro<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    aggro(ctx) == AggroLevel::Hard
}

pub fn soft_aggro<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    aggro(ctx) == AggroLevel::Soft
}

pub fn carrying_loot<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.world.carried_loot(ctx.agent).is_some()
}

/// A pending move, a sweep that found nothing, or a target camping the nest.
pub fn nest_compromised<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let Some(facts) = facts(ctx) else {
        return false;
    };
    let player = &ctx.blackboard.player;
    let nest = nest(ctx);
    let camping = player.visible
        && nest.is_known()
        && player.last_known_position.distance(nest) < NEST_CAMP_DISTANCE;
    facts.migration_target().is_known() || facts.ready_to_migrate() || camping
}

/// Commit a move with the bug's usual handling: acceleration scales with speed.
fn move_towards<W: InstinctWorld>(
    ctx: &mut EvalContext<'_, W>,
    target: Vec3,
    speed: f32,
    budget: f32,
    label: &'static str,
) -> bool {
    if !target.is_known() {
        return false;
    }
    let request = MoveRequest::new(target, 4.0, budget, speed)
        .acceleration(speed * 1.8)
        .stopping_distance(0.35)
        .allow_partial();
    move_to(ctx, label, request)
}

/// Charge the intruder; on contact, eye whatever it dropped.
pub fn execute_fatal_aggro<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let last = ctx.blackboard.player.last_known_position;
    let target = if last.is_known() { last } else { nest(ctx) };
    if !move_towards(ctx, target, 12.0, 24.0, "HoarderFatal") {
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) > 1.6 {
        return BtStatus::Running;
    }
    if !carrying_loot(ctx) {
        if let Some(loot) = ctx.world.loot_near(target, 3.0) {
            update(ctx, |f| f.mark_item_located(loot));
        }
    }
    BtStatus::Success
}

/// Buzz past the intruder, just beyond and to the side of it.
pub fn execute_hard_aggro<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let player = ctx.blackboard.player;
    if !player.visible {
        return BtStatus::Failure;
    }
    let to_player = (player.last_known_position - ctx.position()).flat().normalized();
    let mut lateral = Vec3::new(to_player.z, 0.0, -to_player.x);
    if lateral.length_squared() < 0.01 {
        lateral = ctx.rng(IDLE_STREAM).inside_unit_circle();
    }
    let buzz = player.last_known_position + to_player * 4.0 + lateral.normalized() * 2.5;
    if move_towards(ctx, buzz, 8.0, 18.0, "HoarderBuzz") {
        update(ctx, |f| f.trigger_aggro(1.5));
        return BtStatus::Running;
    }
    BtStatus::Failure
}

/// Posture between the intruder and the nest.
pub fn execute_soft_aggro<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let player = ctx.blackboard.player;
    if !player.visible {
        return BtStatus::Failure;
    }
    let mut away = (ctx.position() - player.last_known_position).flat();
    if away.length_squared() < 0.01 {
        away = ctx.rng(IDLE_STREAM).inside_unit_circle();
    }
    let warn = nest(ctx) + away.normalized() * 3.0;
    update(ctx, |f| f.trigger_aggro(1.0));
    if move_towards(ctx, warn, 6.0, 12.0, "HoarderWarn") {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

pub fn return_loot<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    if !carrying_loot(ctx) {
        return BtStatus::Success;
    }
    let nest = nest(ctx);
    if !nest.is_known() {
        return BtStatus::Failure;
    }
    if ctx.position().distance(nest) <= ARRIVAL_DISTANCE {
        ctx.world.drop_loot(ctx.agent);
        update(ctx, HoarderFacts::record_delivery);
        ctx.set_active_action("HoarderDropLoot");
        return BtStatus::Success;
    }
    if move_towards(ctx, nest, 6.5, 20.0, "HoarderReturn") {
        BtStatus::Running
    } else {
        BtStatus::Failure
    }
}

/// Chase a spotted item, or walk the sweep and look around each waypoint.
pub fn search_for_items<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let own = ctx.position();

    if let Some(loot) = snapshot.target_loot() {
        if own.distance(loot.position) <= LOOT_REACH {
            let grabbed = ctx.world.pick_up_loot(ctx.agent, loot.id);
            update(ctx, |f| f.target_loot = None);
            if grabbed {
                ctx.set_active_action("HoarderGrabScrap");
                return BtStatus::Success;
            }
            return BtStatus::Failure;
        }
        if move_towards(ctx, loot.position, 6.5, 30.0, "HoarderPursueScrap") {
            return BtStatus::Running;
        }
        update(ctx, |f| f.target_loot = None);
        return BtStatus::Failure;
    }

    let mut target = snapshot.search_target;
    if target.is_known() && own.distance(target) <= LOOT_REACH {
        match ctx.world.loot_near(target, 6.0) {
            Some(loot) => {
                update(ctx, |f| f.mark_item_located(loot));
            }
            None => {
                update(ctx, |f| f.trigger_aggro(0.35));
            }
        }
        target = Vec3::UNKNOWN;
    }
    if !target.is_known() {
        let navigator = ctx.world.navigator();
        let next = ctx
            .blackboard
            .block_mut(HOARDER_FACTS)
            .and_then(|f| f.next_search_target(navigator));
        target = next.unwrap_or(Vec3::UNKNOWN);
        update(ctx, |f| f.search_target = target);
        if !target.is_known() {
            return BtStatus::Failure;
        }
    }

    if move_towards(ctx, target, 5.5, 30.0, "HoarderScavenge") {
        return BtStatus::Running;
    }
    update(ctx, |f| f.search_target = Vec3::UNKNOWN);
    BtStatus::Failure
}

/// A walkable point 22 to 34 meters from `nest`.
fn select_migration_target(
    navigator: &dyn Navigator,
    rng: &mut impl DeterministicRng,
    nest: Vec3,
) -> Option<Vec3> {
    for _ in 0..6 {
        let offset = rng.inside_unit_circle();
        if offset.length_squared() < 0.1 {
            continue;
        }
        let guess = nest + offset.normalized() * rng.next_f32_range(22.0, 34.0);
        if let Some(point) = navigator.sample_position(guess, 8.0) {
            return Some(point);
        }
    }
    None
}

/// Carry the nest, and the territory with it, somewhere fresh.
pub fn migrate_nest<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let nest = nest(ctx);
    let mut target = facts(ctx).map_or(Vec3::UNKNOWN, HoarderFacts::migration_target);
    if !target.is_known() {
        let mut rng = ctx.rng(MIGRATION_STREAM);
        let Some(picked) = select_migration_target(ctx.world.navigator(), &mut rng, nest) else {
            return BtStatus::Failure;
        };
        update(ctx, |f| f.request_migration(picked));
        target = picked;
    }

    if !move_towards(ctx, target, 6.0, 40.0, "HoarderMigrate") {
        update(ctx, HoarderFacts::cancel_migration);
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) < ARRIVAL_DISTANCE {
        update(ctx, |f| f.confirm_migration(target));
        ctx.blackboard.relocate_territory(target);
        ctx.set_active_action("HoarderNestSet");
        return BtStatus::Success;
    }
    BtStatus::Running
}

pub fn idle_around_nest<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let nest = nest(ctx);
    if !nest.is_known() {
        return BtStatus::Failure;
    }
    let mut point = facts(ctx).map_or(Vec3::UNKNOWN, |f| f.idle_point);
    if !point.is_known() || ctx.position().distance(point) < 0.5 {
        point = nest + ctx.rng(IDLE_STREAM).inside_unit_circle() * 2.5;
        update(ctx, |f| {
            f.idle_point = point;
            f.idle_timer.latch(4.0);
        });
    }
    if move_towards(ctx, point, 3.0, 10.0, "HoarderIdle") {
        BtStatus::Running
    } else {
        update(ctx, |f| f.idle_point = Vec3::UNKNOWN);
        BtStatus::Failure
    }
}
