//! Flowerman: stalks from behind, stares back when caught, snaps once angered.
//!
//! Anger builds while the target is in view and faster when the target stares at it.
//! Past [`ANGER_THRESHOLD`] it commits to a sprint for the target and resets on
//! contact. Otherwise it slips into the target's blind spot or a flank behind it.

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    clamp01, lerp, Blackboard, BlockKey, Commons, DeterministicRng, FactBlock, LatchTimer,
    PlayerFacts, Species, TickContext, Vec3,
};
use instinct_nav::{MoveRequest, Navigator};
use instinct_sense::ScanReport;

use crate::steer::{self, halt, move_to};
use crate::{InstinctWorld, SpeciesModule};

pub const FLOWERMAN_FACTS: BlockKey<FlowermanFacts> = BlockKey::new(7);

pub const ANGER_THRESHOLD: f32 = 12.0;
/// Anger never climbs past this multiple of the threshold.
const ANGER_CAP: f32 = 1.35;
const CALM_DELAY_SECONDS: f32 = 2.0;
const CALM_RATE: f32 = 0.5;
/// Minimum cosine between the target's view and the line to the flowerman.
pub const WATCHED_DOT: f32 = 0.65;
/// Below this cosine between consecutive views the cached vectors are stale.
const VIEW_CHANGE_DOT: f32 = 0.75;
const BLIND_SPOT_REFRESH_SECONDS: f32 = 0.25;
const FLANK_REFRESH_SECONDS: f32 = 0.2;
const FLANK_DISTANCE: f32 = 10.0;
const ESCAPE_HOLD_SECONDS: f32 = 2.5;
pub const SNAP_DISTANCE: f32 = 1.8;
const STALK_MIN_DISTANCE: f32 = 2.5;
const CLOSE_AGGRO_DISTANCE: f32 = 5.0;
const HAUNT_RADIUS: f32 = 3.0;
const HAUNT_REFRESH_SECONDS: f32 = 4.0;
const HAUNT_STREAM: u64 = 0xF10;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowermanFacts {
    anger: f32,
    calm_timer: LatchTimer,
    cached_view: Vec3,
    blind_spot: Vec3,
    blind_spot_refresh: LatchTimer,
    flank: Vec3,
    flank_refresh: LatchTimer,
    escape: Vec3,
    escape_timer: LatchTimer,
    haunt_point: Vec3,
    haunt_timer: LatchTimer,
}

impl Default for FlowermanFacts {
    fn default() -> Self {
        Self {
            anger: 0.0,
            calm_timer: LatchTimer::new(),
            cached_view: Vec3::FORWARD,
            blind_spot: Vec3::UNKNOWN,
            blind_spot_refresh: LatchTimer::new(),
            flank: Vec3::UNKNOWN,
            flank_refresh: LatchTimer::new(),
            escape: Vec3::UNKNOWN,
            escape_timer: LatchTimer::new(),
            haunt_point: Vec3::UNKNOWN,
            haunt_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for FlowermanFacts {
    fn name(&self) -> &'static str {
        "flowerman"
    }

    fn decay(&mut self, dt: f32) {
        self.calm_timer.decay(dt);
        self.blind_spot_refresh.decay(dt);
        self.flank_refresh.decay(dt);
        if self.escape_timer.is_active() {
            self.escape_timer.decay(dt);
            if !self.escape_timer.is_active() {
                self.escape = Vec3::UNKNOWN;
            }
        }
        if self.haunt_timer.is_active() {
            self.haunt_timer.decay(dt);
            if !self.haunt_timer.is_active() {
                self.haunt_point = Vec3::UNKNOWN;
            }
        }
    }
}

impl FlowermanFacts {
    pub fn anger(&self) -> f32 {
        self.anger
    }

    pub fn anger_ready(&self) -> bool {
        self.anger >= ANGER_THRESHOLD
    }

    /// Anger as a fraction of the threshold, in `[0, 1]`.
    pub fn anger_ratio(&self) -> f32 {
        clamp01(self.anger / ANGER_THRESHOLD)
    }

    /// Raise anger and hold off cooling for a moment.
    pub fn add_anger(&mut self, amount: f32) {
        if !(amount > 0.0) || !amount.is_finite() {
            return;
        }
        self.anger = (self.anger + amount).min(ANGER_THRESHOLD * ANGER_CAP);
        self.calm_timer.latch(CALM_DELAY_SECONDS);
    }

    pub fn cool(&mut self, amount: f32) {
        if !(amount > 0.0) || !amount.is_finite() {
            return;
        }
        self.anger = (self.anger - amount).max(0.0);
    }

    pub fn reset_anger(&mut self) {
        self.anger = 0.0;
        self.calm_timer.clear();
    }

    pub fn is_calming(&self) -> bool {
        !self.calm_timer.is_active()
    }

    pub fn blind_spot(&self) -> Vec3 {
        self.blind_spot
    }

    pub fn flank(&self) -> Vec3 {
        self.flank
    }

    pub fn escape(&self) -> Vec3 {
        self.escape
    }

    /// Passive anger for one scan: builds while the target is in view, otherwise
    /// cools once the calm delay has run out.
    pub fn absorb_sighting(&mut self, player: &PlayerFacts, dt: f32) {
        if player.visible {
            self.add_anger(dt * 0.25);
            if player.distance < 9.0 {
                self.add_anger(dt * 0.15);
            }
        } else if self.is_calming() {
            self.cool(dt * CALM_RATE);
        }
    }

    /// Recompute the blind spot and flank behind the target when their refresh is due
    /// or the target turned sharply.
    pub fn refresh_vectors(&mut self, navigator: &dyn Navigator, own: Vec3, player: &PlayerFacts) {
        let last = player.last_known_position;
        if !last.is_known() {
            self.blind_spot = Vec3::UNKNOWN;
            self.flank = Vec3::UNKNOWN;
            return;
        }

        let mut view = view_direction(player, own);
        if view.length_squared() < 0.01 {
            view = Vec3::FORWARD;
        }
        if self.cached_view.dot(view) < VIEW_CHANGE_DOT {
            self.blind_spot_refresh.clear();
            self.flank_refresh.clear();
        }
        self.cached_view = view;

        if !self.blind_spot_refresh.is_active() {
            let reach = (player.distance * 0.6).max(4.5);
            let guess = last - view * reach;
            self.blind_spot = navigator.sample_position(guess, 4.5).unwrap_or(Vec3::UNKNOWN);
            self.blind_spot_refresh.latch(BLIND_SPOT_REFRESH_SECONDS);
        }
        if !self.flank_refresh.is_active() {
            let guess = last - view * FLANK_DISTANCE;
            self.flank = navigator.sample_position(guess, 6.0).unwrap_or(Vec3::UNKNOWN);
            self.flank_refresh.latch(FLANK_REFRESH_SECONDS);
        }
    }

    /// Pick a point off to the side of the target's view line and hold it briefly.
    pub fn plan_escape(&mut self, navigator: &dyn Navigator, own: Vec3, player: &PlayerFacts) {
        let last = player.last_known_position;
        if !last.is_known() {
            self.escape = Vec3::UNKNOWN;
            return;
        }
        let view = if player.last_known_forward.flat().length_squared() < 0.01 {
            (last - own).flat().normalized()
        } else {
            player.last_known_forward.flat().normalized()
        };
        let mut lateral = Vec3::new(view.z, 0.0, -view.x);
        if lateral.length_squared() < 0.01 {
            lateral = Vec3::new(1.0, 0.0, 0.0);
        }
        let offset = lateral.normalized() * if player.distance < 6.0 { 8.0 } else { 5.0 };
        self.escape = navigator
            .sample_position(own + offset, 5.0)
            .or_else(|| navigator.sample_position(own - offset, 5.0))
            .unwrap_or(Vec3::UNKNOWN);
        self.escape_timer.latch(ESCAPE_HOLD_SECONDS);
    }
}

/// Where the target is looking; toward the flowerman when its facing is unknown.
fn view_direction(player: &PlayerFacts, own: Vec3) -> Vec3 {
    let forward = player.last_known_forward.flat();
    if forward.length_squared() < 0.01 {
        (own - player.last_known_position).flat().normalized()
    } else {
        forward.normalized()
    }
}

/// Whether the target's view cone holds `own`.
pub fn watched_by(player: &PlayerFacts, own: Vec3) -> bool {
    let last = player.last_known_position;
    if !last.is_known() {
        return false;
    }
    let to_own = (own - last).flat();
    if to_own.length_squared() < 0.01 {
        return false;
    }
    let to_own = to_own.normalized();
    view_direction(player, own).dot(to_own) >= WATCHED_DOT
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlowermanModule;

impl<W> SpeciesModule<W> for FlowermanModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Flowerman
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(FLOWERMAN_FACTS, FlowermanFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "FlowermanRoot",
            vec![
                sequence(
                    "FlowermanAggro",
                    vec![
                        condition("FlowermanAggroReady", should_aggro),
                        action("FlowermanVectorRefresh", update_vectors),
                        action("FlowermanAggroExecute", execute_aggro),
                    ],
                ),
                sequence(
                    "FlowermanStare",
                    vec![
                        condition("FlowermanObserved", being_watched),
                        action("FlowermanStareAction", stare_down),
                        action("FlowermanBreakSight", break_line_of_sight),
                    ],
                ),
                sequence(
                    "FlowermanStalk",
                    vec![
                        condition("FlowermanCanStalk", can_stalk),
                        action("FlowermanPlan", update_vectors),
                        action("FlowermanShadow", sweep_shadow),
                    ],
                ),
                action("FlowermanIdle", idle_haunt),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Flowerman, root)
    }

    fn on_scan(
        &self,
        tick: &TickContext,
        _report: &ScanReport,
        blackboard: &mut Blackboard,
        _commons: &mut Commons,
    ) {
        let player = blackboard.player;
        if let Some(facts) = blackboard.block_mut(FLOWERMAN_FACTS) {
            facts.absorb_sighting(&player, tick.dt());
        }
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b FlowermanFacts> {
    ctx.blackboard.block(FLOWERMAN_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut FlowermanFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(FLOWERMAN_FACTS).map(apply)
}

fn has_target<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    ctx.blackboard.player.has_known_position()
}

pub fn being_watched<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    watched_by(&ctx.blackboard.player, ctx.position())
}

pub fn should_aggro<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    if !has_target(ctx) {
        return false;
    }
    if facts(ctx).is_some_and(FlowermanFacts::anger_ready) {
        return true;
    }
    being_watched(ctx) && ctx.blackboard.player.distance <= CLOSE_AGGRO_DISTANCE
}

pub fn can_stalk<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    has_target(ctx) && ctx.blackboard.player.distance > STALK_MIN_DISTANCE
}

fn refresh<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) {
    let own = ctx.position();
    let player = ctx.blackboard.player;
    let navigator = ctx.world.navigator();
    if let Some(facts) = ctx.blackboard.block_mut(FLOWERMAN_FACTS) {
        facts.refresh_vectors(navigator, own, &player);
    }
}

pub fn update_vectors<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    refresh(ctx);
    let planned = facts(ctx).is_some_and(|f| f.flank().is_known() || f.blind_spot().is_known());
    if planned {
        ctx.set_active_action("FlowermanPlanVectors");
        BtStatus::Success
    } else {
        BtStatus::Failure
    }
}

/// Stop, turn to face the target, and let the stare feed anger.
pub fn stare_down<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    halt(ctx, 0.0);
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        actuator.set_acceleration(4.0);
    }
    let last = ctx.blackboard.player.last_known_position;
    if last.is_known() {
        let look = (last - ctx.position()).flat();
        if look.length_squared() > 0.01 {
            ctx.world.face(ctx.agent, look);
        }
    }
    let close_boost = clamp01((8.0 - ctx.blackboard.player.distance) / 8.0);
    let dt = ctx.dt();
    update(ctx, |f| f.add_anger(dt * (1.5 + close_boost)));
    ctx.set_active_action("FlowermanStare");
    BtStatus::Success
}

/// Slip sideways out of the target's view.
pub fn break_line_of_sight<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let own = ctx.position();
    if !being_watched(ctx) {
        return BtStatus::Success;
    }
    let player = ctx.blackboard.player;
    if facts(ctx).is_some_and(|f| !f.escape().is_known()) {
        let navigator = ctx.world.navigator();
        if let Some(facts) = ctx.blackboard.block_mut(FLOWERMAN_FACTS) {
            facts.plan_escape(navigator, own, &player);
        }
    }
    let Some(target) = facts(ctx).map(FlowermanFacts::escape).filter(|t| t.is_known()) else {
        return BtStatus::Failure;
    };

    let dt = ctx.dt();
    if own.distance(target) < 0.8 {
        update(ctx, |f| f.cool(dt * 0.2));
        return BtStatus::Success;
    }
    let request = MoveRequest::new(target, 3.0, 24.0, 5.5)
        .acceleration(10.5)
        .stopping_distance(0.4)
        .allow_partial();
    if move_to(ctx, "FlowermanFlee", request) {
        update(ctx, |f| f.add_anger(dt * 0.5));
        return BtStatus::Running;
    }
    let navigator = ctx.world.navigator();
    if let Some(facts) = ctx.blackboard.block_mut(FLOWERMAN_FACTS) {
        facts.plan_escape(navigator, own, &player);
    }
    BtStatus::Failure
}

/// Creep into the blind spot, or circle wide to the flank behind the target.
pub fn sweep_shadow<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    refresh(ctx);
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let own = ctx.position();

    let blind_spot = snapshot.blind_spot();
    if blind_spot.is_known() {
        let distance = own.distance(blind_spot);
        if distance > 1.25 {
            let speed = lerp(1.6, 3.0, distance / 6.0);
            let request = MoveRequest::new(blind_spot, 3.0, 30.0, speed)
                .acceleration(4.5)
                .stopping_distance(0.35)
                .allow_partial();
            if move_to(ctx, "FlowermanSneak", request) {
                return BtStatus::Running;
            }
        }
    }

    let flank = snapshot.flank();
    if !flank.is_known() {
        return BtStatus::Failure;
    }
    let speed = if ctx.blackboard.player.distance > 12.0 { 4.5 } else { 3.75 };
    let request = MoveRequest::new(flank, 4.0, 60.0, speed)
        .acceleration(7.0)
        .stopping_distance(0.6)
        .allow_partial();
    if move_to(ctx, "FlowermanStalk", request) {
        let dt = ctx.dt();
        update(ctx, |f| f.add_anger(dt * 0.2));
        return BtStatus::Running;
    }
    BtStatus::Failure
}

/// Sprint for the target, faster the angrier it is; anger resets on contact.
pub fn execute_aggro<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let target = ctx.blackboard.player.last_known_position;
    if !target.is_known() {
        return BtStatus::Failure;
    }
    let aggression = lerp(0.85, 1.35, facts(ctx).map_or(0.0, FlowermanFacts::anger_ratio));
    let budget = ctx.blackboard.territory().radius * 4.0 + 30.0;
    let request = MoveRequest::new(target, 4.0, budget, 8.5 * aggression)
        .acceleration(16.0)
        .stopping_distance(0.25);
    if !move_to(ctx, "FlowermanAggro", request) {
        return BtStatus::Failure;
    }
    if ctx.position().distance(target) <= SNAP_DISTANCE {
        update(ctx, FlowermanFacts::reset_anger);
        ctx.set_active_action("FlowermanSnapWindow");
        return BtStatus::Success;
    }
    BtStatus::Running
}

/// Drift around the territory center while anger settles.
pub fn idle_haunt<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let dt = ctx.dt();
    let own = ctx.position();

    let mut point = snapshot.haunt_point;
    if !point.is_known() || own.distance(point) < 0.6 {
        let center = ctx.blackboard.territory().center;
        let anchor = if center.is_known() { center } else { own };
        point = anchor + ctx.rng(HAUNT_STREAM).inside_unit_circle() * HAUNT_RADIUS;
        update(ctx, |f| {
            f.haunt_point = point;
            f.haunt_timer.latch(HAUNT_REFRESH_SECONDS);
        });
    }

    let request = MoveRequest::new(point, 3.0, 20.0, 2.2)
        .acceleration(4.0)
        .stopping_distance(0.35)
        .allow_partial();
    if move_to(ctx, "FlowermanIdle", request) {
        update(ctx, |f| f.cool(dt * 0.4));
        return BtStatus::Running;
    }
    update(ctx, |f| {
        f.cool(dt * 0.5);
        f.haunt_point = Vec3::UNKNOWN;
    });
    BtStatus::Failure
}
