//! Thumper: telegraphed windup, committed charge, recovery.
//!
//! `Idle -> Priming -> Charging -> Recovering -> Idle`. The charge destination is
//! fixed when priming starts and never re-aimed, and the cooldown latched on entering
//! `Charging` outlasts the charge plus its recovery, so charges cannot chain.

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{clamp01, lerp, Blackboard, BlockKey, FactBlock, LatchTimer, Species, Vec3};
use instinct_nav::{MoveRequest, Navigator};
use instinct_sense::{HitTag, LayerMask};

use crate::steer::{self, move_or_fail, move_to};
use crate::{InstinctWorld, SpeciesModule};

pub const THUMPER_FACTS: BlockKey<ThumperFacts> = BlockKey::new(2);

pub const WINDUP_SECONDS: f32 = 1.0;
pub const CHARGE_SECONDS: f32 = 2.75;
pub const CHARGE_COOLDOWN_SECONDS: f32 = 3.5;
pub const STUN_RECOVERY_SECONDS: f32 = 1.0;
pub const RECOVERY_SECONDS: f32 = 0.45;
/// Charge time before a stalled actuator counts as an impact.
const IMPACT_GRACE_SECONDS: f32 = 0.4;
const PATROL_REFRESH_SECONDS: f32 = 6.0;
const SPRINT_TIMEOUT_SECONDS: f32 = 5.0;
const HUNT_MEMORY_SECONDS: f32 = 8.0;
const DIRECTION_SEEDS: usize = 16;
const EDGE_CLEARANCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChargeState {
    #[default]
    Idle,
    Priming,
    Charging,
    Recovering,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumperFacts {
    state: ChargeState,
    windup: LatchTimer,
    charge_remaining: LatchTimer,
    charge_total: f32,
    recovery: LatchTimer,
    cooldown: LatchTimer,
    charge_direction: Vec3,
    charge_target: Vec3,
    patrol_target: Vec3,
    patrol_refresh: LatchTimer,
    sprint_target: Vec3,
    sprint_timer: LatchTimer,
}

impl Default for ThumperFacts {
    fn default() -> Self {
        Self {
            state: ChargeState::Idle,
            windup: LatchTimer::new(),
            charge_remaining: LatchTimer::new(),
            charge_total: 0.0,
            recovery: LatchTimer::new(),
            cooldown: LatchTimer::new(),
            charge_direction: Vec3::FORWARD,
            charge_target: Vec3::UNKNOWN,
            patrol_target: Vec3::UNKNOWN,
            patrol_refresh: LatchTimer::new(),
            sprint_target: Vec3::UNKNOWN,
            sprint_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for ThumperFacts {
    fn name(&self) -> &'static str {
        "thumper"
    }

    fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.cooldown.decay(dt);

        match self.state {
            ChargeState::Priming => self.windup.decay(dt),
            ChargeState::Charging => {
                self.charge_remaining.decay(dt);
                if !self.charge_remaining.is_active() {
                    self.stop_charge(false);
                }
            }
            ChargeState::Recovering => {
                self.recovery.decay(dt);
                if !self.recovery.is_active() {
                    self.state = ChargeState::Idle;
                }
            }
            ChargeState::Idle => {}
        }

        if self.patrol_refresh.is_active() {
            self.patrol_refresh.decay(dt);
            if !self.patrol_refresh.is_active() {
                self.clear_patrol_target();
            }
        }
        if self.sprint_timer.is_active() {
            self.sprint_timer.decay(dt);
            if !self.sprint_timer.is_active() {
                self.clear_sprint_target();
            }
        }
    }
}

impl ThumperFacts {
    pub fn state(&self) -> ChargeState {
        self.state
    }

    pub fn can_prime(&self) -> bool {
        self.state == ChargeState::Idle && !self.cooldown.is_active()
    }

    pub fn priming(&self) -> bool {
        self.state == ChargeState::Priming
    }

    pub fn ready_to_burst(&self) -> bool {
        self.state == ChargeState::Priming && !self.windup.is_active()
    }

    pub fn charging(&self) -> bool {
        self.state == ChargeState::Charging && self.charge_remaining.is_active()
    }

    pub fn needs_recovery(&self) -> bool {
        self.state == ChargeState::Recovering && self.recovery.is_active()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown.remaining()
    }

    /// Latch the charge cooldown without changing state.
    pub fn hold_cooldown(&mut self, seconds: f32) {
        self.cooldown.latch(seconds);
    }

    pub fn charge_destination(&self) -> Vec3 {
        self.charge_target
    }

    pub fn charge_direction(&self) -> Vec3 {
        self.charge_direction
    }

    /// Fraction of the charge already spent, in `[0, 1]`.
    pub fn charge_progress(&self) -> f32 {
        if self.charge_total <= 0.0 {
            return 0.0;
        }
        clamp01(1.0 - self.charge_remaining.remaining() / self.charge_total)
    }

    pub fn charge_elapsed(&self) -> f32 {
        (self.charge_total - self.charge_remaining.remaining()).max(0.0)
    }

    /// Start the windup and commit the charge line from `own` through `target`.
    /// Refused unless idle with the cooldown elapsed.
    pub fn prime(&mut self, own: Vec3, target: Vec3) -> bool {
        if !self.can_prime() {
            return false;
        }
        self.state = ChargeState::Priming;
        self.windup.latch(WINDUP_SECONDS);

        let mut direction = target - own;
        if !direction.is_known() || direction.length_squared() < 0.01 {
            direction = Vec3::FORWARD;
        }
        self.charge_direction = direction.normalized();
        let reach = (direction.length() + 6.0).max(8.0);
        self.charge_target = own + self.charge_direction * reach;
        true
    }

    pub fn begin_charge(&mut self, duration: f32) {
        self.state = ChargeState::Charging;
        self.windup.clear();
        self.charge_remaining.latch(duration);
        self.charge_total = self.charge_remaining.remaining();
        self.cooldown.latch(CHARGE_COOLDOWN_SECONDS);
    }

    pub fn stop_charge(&mut self, stunned: bool) {
        self.state = ChargeState::Recovering;
        self.recovery.latch(if stunned {
            STUN_RECOVERY_SECONDS
        } else {
            RECOVERY_SECONDS
        });
        self.charge_target = Vec3::UNKNOWN;
        self.charge_remaining.clear();
        self.charge_total = 0.0;
    }

    pub fn force_idle(&mut self) {
        self.state = ChargeState::Idle;
        self.charge_target = Vec3::UNKNOWN;
        self.windup.clear();
        self.charge_remaining.clear();
        self.charge_total = 0.0;
        self.recovery.clear();
    }

    pub fn patrol_target(&self) -> Vec3 {
        self.patrol_target
    }

    fn set_patrol_target(&mut self, target: Vec3) {
        self.patrol_target = target;
        self.patrol_refresh.latch(PATROL_REFRESH_SECONDS);
    }

    fn clear_patrol_target(&mut self) {
        self.patrol_target = Vec3::UNKNOWN;
        self.patrol_refresh.clear();
    }

    pub fn sprint_target(&self) -> Vec3 {
        self.sprint_target
    }

    fn set_sprint_target(&mut self, target: Vec3) {
        self.sprint_target = target;
        self.sprint_timer.latch(SPRINT_TIMEOUT_SECONDS);
    }

    fn clear_sprint_target(&mut self) {
        self.sprint_target = Vec3::UNKNOWN;
        self.sprint_timer.clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThumperModule;

impl<W> SpeciesModule<W> for ThumperModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::Thumper
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(THUMPER_FACTS, ThumperFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "ThumperRoot",
            vec![
                sequence(
                    "ThumperRecover",
                    vec![
                        condition("ThumperNeedsRecovery", needs_recovery),
                        action("ThumperRecoverAction", recover),
                    ],
                ),
                sequence(
                    "ThumperChargeSequence",
                    vec![
                        condition("ThumperSeesPlayer", can_engage),
                        condition("ThumperCanPrime", can_prime),
                        action("ThumperPrimeAction", prime_charge),
                        action("ThumperChargeAction", execute_charge),
                    ],
                ),
                sequence(
                    "ThumperHunt",
                    vec![
                        condition("ThumperHuntMemory", hunt_from_memory),
                        action("ThumperMoveToLKP", move_to_last_known),
                        action("ThumperPredict", predictive_sprint),
                    ],
                ),
                action("ThumperPatrol", patrol),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::Thumper, root)
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b ThumperFacts> {
    ctx.blackboard.block(THUMPER_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut ThumperFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(THUMPER_FACTS).map(apply)
}

pub fn needs_recovery<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(ThumperFacts::needs_recovery)
}

pub fn can_engage<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let visible = ctx.blackboard.player.visible;
    facts(ctx).is_some_and(|f| visible || f.priming() || f.charging())
}

pub fn can_prime<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(|f| f.priming() || f.charging() || f.can_prime())
}

pub fn hunt_from_memory<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    let player = &ctx.blackboard.player;
    !player.visible
        && player.has_known_position()
        && player.time_since_seen.seconds() < HUNT_MEMORY_SECONDS
}

pub fn recover<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        actuator.reset_path();
        actuator.set_speed(0.0);
        actuator.set_acceleration(6.0);
    }
    ctx.set_active_action("ThumperRecover");
    if needs_recovery(ctx) {
        BtStatus::Running
    } else {
        BtStatus::Success
    }
}

/// Hold still through the windup. Losing sight of the target aborts the charge.
pub fn prime_charge<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    if snapshot.charging() {
        return BtStatus::Success;
    }
    if !ctx.blackboard.player.visible {
        update(ctx, ThumperFacts::force_idle);
        return BtStatus::Failure;
    }
    if !snapshot.priming() {
        let own = ctx.position();
        let target = ctx.blackboard.player.last_known_position;
        if update(ctx, |f| f.prime(own, target)) != Some(true) {
            return BtStatus::Failure;
        }
    }

    ctx.set_active_action("ThumperPrime");
    if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
        actuator.reset_path();
    }
    if facts(ctx).is_some_and(ThumperFacts::ready_to_burst) {
        BtStatus::Success
    } else {
        BtStatus::Running
    }
}

/// Drive toward the destination committed at priming, ramping speed with progress.
pub fn execute_charge<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let started = update(ctx, |f| {
        if !f.charging() {
            f.begin_charge(CHARGE_SECONDS);
        }
        f.charging()
    });
    if started != Some(true) {
        return BtStatus::Success;
    }
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };

    if ctx.world.actuator(ctx.agent).is_none() {
        update(ctx, |f| f.stop_charge(false));
        return BtStatus::Failure;
    }

    let mut destination = snapshot.charge_destination();
    if !destination.is_known() {
        destination = ctx.position() + snapshot.charge_direction() * 10.0;
    }
    let progress = snapshot.charge_progress();
    let request = MoveRequest::new(destination, 1.5, 60.0, lerp(6.0, 16.0, progress))
        .acceleration(lerp(12.0, 40.0, progress))
        .stopping_distance(0.05)
        .allow_partial();
    if !move_to(ctx, "ThumperCharge", request) {
        update(ctx, |f| f.stop_charge(false));
        return BtStatus::Failure;
    }

    if detect_impact(ctx, &snapshot) {
        update(ctx, |f| f.stop_charge(true));
        ctx.set_active_action("ThumperImpact");
        return BtStatus::Running;
    }

    BtStatus::Running
}

/// A stalled actuator with path left, or geometry right ahead of the charge line.
fn detect_impact<W: InstinctWorld>(ctx: &EvalContext<'_, W>, facts: &ThumperFacts) -> bool {
    let Some(actuator) = ctx.world.actuator(ctx.agent) else {
        return false;
    };
    if facts.charge_elapsed() >= IMPACT_GRACE_SECONDS
        && actuator.velocity().length_squared() < 1.5
        && actuator.remaining_distance() > 1.25
    {
        return true;
    }

    let origin = ctx.position() + Vec3::UP * 0.25;
    let ahead = ctx.world.raycast(
        origin,
        facts.charge_direction(),
        0.9,
        LayerMask::DEFAULT | LayerMask::ENVIRONMENT,
    );
    ahead.is_some_and(|hit| hit.tag == HitTag::Geometry)
}

pub fn move_to_last_known<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let last = ctx.blackboard.player.last_known_position;
    if !last.is_known() {
        return BtStatus::Failure;
    }
    if ctx.position().distance(last) < 1.0 {
        ctx.set_active_action("ThumperTrack");
        return BtStatus::Success;
    }
    let request = MoveRequest::new(last, 3.0, ctx.profile.hunt_engage_distance(), 6.5)
        .acceleration(14.0)
        .stopping_distance(0.35)
        .allow_partial();
    move_or_fail(ctx, "ThumperTrack", request)
}

/// From the last sighting, sprint down the most promising open corridor.
pub fn predictive_sprint<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let aggro = ctx.profile.hunting_aggro_distance;

    let mut target = snapshot.sprint_target();
    if !target.is_known() {
        let anchor = ctx.blackboard.player.last_known_position;
        let Some(corridor) =
            project_corridor(ctx.world.navigator(), anchor, ctx.forward(), aggro * 1.75)
        else {
            return BtStatus::Failure;
        };
        update(ctx, |f| f.set_sprint_target(corridor));
        target = corridor;
    }

    if ctx.position().distance(target) < 1.2 || ctx.blackboard.player.visible {
        update(ctx, ThumperFacts::clear_sprint_target);
        return BtStatus::Success;
    }

    let request = MoveRequest::new(target, 2.0, aggro * 2.0, 8.5)
        .acceleration(18.0)
        .stopping_distance(0.4)
        .allow_partial();
    if move_to(ctx, "ThumperPredict", request) {
        return BtStatus::Running;
    }
    update(ctx, ThumperFacts::clear_sprint_target);
    BtStatus::Failure
}

pub fn patrol<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    let territory = ctx.blackboard.territory();

    let mut target = snapshot.patrol_target();
    if !target.is_known() {
        let Some(picked) = select_patrol_target(
            ctx.world.navigator(),
            ctx.position(),
            ctx.forward(),
            territory.center,
            territory.radius.max(6.0),
        ) else {
            return BtStatus::Failure;
        };
        update(ctx, |f| f.set_patrol_target(picked));
        target = picked;
    }

    if ctx.position().distance(target) < 1.25 {
        update(ctx, ThumperFacts::clear_patrol_target);
        return BtStatus::Success;
    }

    let request = MoveRequest::new(target, 3.0, territory.radius * 2.5, 5.25)
        .acceleration(10.0)
        .stopping_distance(0.5)
        .allow_partial();
    if move_to(ctx, "ThumperPatrol", request) {
        return BtStatus::Running;
    }
    update(ctx, ThumperFacts::clear_patrol_target);
    BtStatus::Failure
}

fn direction_seeds() -> impl Iterator<Item = Vec3> {
    (0..DIRECTION_SEEDS).map(|i| {
        let angle = (360.0 / DIRECTION_SEEDS as f32 * i as f32).to_radians();
        Vec3::new(angle.cos(), 0.0, angle.sin())
    })
}

/// Walk `distance` along `direction`, stopping just short of the first navmesh edge.
/// `None` when the edge is closer than two meters.
fn project_direction(navigator: &dyn Navigator, origin: Vec3, direction: Vec3, distance: f32) -> Option<Vec3> {
    if direction.length_squared() < 0.001 {
        return None;
    }
    let direction = direction.normalized();
    let end = origin + direction * distance;
    match navigator.raycast(origin, end) {
        Some(hit) if hit.distance < 2.0 => None,
        Some(hit) => Some(origin + direction * (hit.distance - EDGE_CLEARANCE)),
        None => Some(end),
    }
}

/// The corridor from `origin` that is long and lined up with `forward`.
pub fn project_corridor(navigator: &dyn Navigator, origin: Vec3, forward: Vec3, max_distance: f32) -> Option<Vec3> {
    if !origin.is_known() {
        return None;
    }
    let anchor = navigator.sample_position(origin, 2.0).unwrap_or(origin);
    let heading = forward.normalized();

    let mut best: Option<(f32, Vec3)> = None;
    for direction in direction_seeds() {
        let Some(candidate) = project_direction(navigator, anchor, direction, max_distance) else {
            continue;
        };
        let travel = anchor.distance(candidate);
        let alignment = heading.dot(direction).abs();
        let score = travel * 0.7 + alignment * 3.0;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, candidate));
        }
    }
    best.filter(|(score, _)| *score > 0.0).map(|(_, point)| point)
}

/// Long, straight legs that do not turn sharply or stray from the territory center.
pub fn select_patrol_target(
    navigator: &dyn Navigator,
    origin: Vec3,
    forward: Vec3,
    territory_center: Vec3,
    radius: f32,
) -> Option<Vec3> {
    if !origin.is_known() {
        return None;
    }
    let anchor = navigator.sample_position(origin, 3.0).unwrap_or(origin);

    let mut best: Option<(f32, Vec3)> = None;
    for direction in direction_seeds() {
        let Some(candidate) = project_direction(navigator, anchor, direction, radius * 1.35) else {
            continue;
        };
        let travel = anchor.distance(candidate);
        let turn_penalty = forward.angle_to(direction) / 90.0;
        let center_bias = if territory_center.is_known() {
            candidate.distance(territory_center) / radius.max(1.0)
        } else {
            0.0
        };
        let straightness = (candidate - anchor).normalized().dot(direction).abs();
        let score = travel * 0.6 + straightness * 3.0 - turn_penalty * 2.1 - center_bias * 1.2;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, point)| point)
}
