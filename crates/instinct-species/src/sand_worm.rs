//! Sand worm: heat-field ambush.
//!
//! Footsteps and dropped items heat a shared field. The worm stalks the hottest cell
//! and, once it is hot enough, runs a staged strike:
//! `Idle -> Approaching -> Charging -> Roaring -> Erupting -> Idle`.

use std::collections::BTreeMap;

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    lerp, Blackboard, BlockKey, Commons, DeterministicRng, FactBlock, HeatField, LatchTimer,
    Species, TargetId, TickContext, Vec3,
};
use instinct_nav::MoveRequest;
use instinct_sense::{ScanReport, StimulusInterest, StimulusKind};
use tracing::debug;

use crate::steer::{self, move_or_fail};
use crate::{CameraShake, InstinctWorld, SpeciesModule};

pub const SAND_WORM_FACTS: BlockKey<SandWormFacts> = BlockKey::new(1);

/// Minimum hotspot heat that opens a strike.
pub const STRIKE_HEAT_THRESHOLD: f32 = 6.0;
/// Heat below which a hottest cell is ignored.
const HOTSPOT_MIN_HEAT: f32 = 0.1;
const ROAR_SECONDS: f32 = 2.0;
const ROAR_BURST: f32 = 2.0;
const ERUPT_SECONDS: f32 = 1.35;
const DAMPEN_RADIUS: f32 = 10.0;
const STALK_REFRESH_SECONDS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AttackStage {
    #[default]
    Idle,
    Approaching,
    Charging,
    Roaring,
    Erupting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandWormFacts {
    hotspot: Vec3,
    hotspot_heat: f32,
    heat_normalized: f32,
    stage: AttackStage,
    cooldown: LatchTimer,
    prep: LatchTimer,
    roar: LatchTimer,
    erupt: LatchTimer,
    stalk_point: Vec3,
    stalk_refresh: LatchTimer,
    eruptions: u32,
}

impl Default for SandWormFacts {
    fn default() -> Self {
        Self {
            hotspot: Vec3::UNKNOWN,
            hotspot_heat: 0.0,
            heat_normalized: 0.0,
            stage: AttackStage::Idle,
            cooldown: LatchTimer::new(),
            prep: LatchTimer::new(),
            roar: LatchTimer::new(),
            erupt: LatchTimer::new(),
            stalk_point: Vec3::UNKNOWN,
            stalk_refresh: LatchTimer::new(),
            eruptions: 0,
        }
    }
}

impl FactBlock for SandWormFacts {
    fn name(&self) -> &'static str {
        "sand_worm"
    }

    fn decay(&mut self, dt: f32) {
        self.cooldown.decay(dt);
        self.prep.decay(dt);
        self.roar.decay(dt);
        self.erupt.decay(dt);
        self.stalk_refresh.decay(dt);
        if !self.stalk_refresh.is_active() {
            self.stalk_point = Vec3::UNKNOWN;
        }
    }
}

impl SandWormFacts {
    /// Track the field's hottest cell.
    pub fn refresh_hotspot(&mut self, field: &HeatField) {
        match field.hottest() {
            Some(cell) => {
                self.hotspot = cell.center;
                self.hotspot_heat = cell.heat;
                self.heat_normalized = field.normalize(cell.heat);
            }
            None => {
                self.hotspot = Vec3::UNKNOWN;
                self.hotspot_heat = 0.0;
                self.heat_normalized = 0.0;
            }
        }
    }

    pub fn has_hotspot(&self) -> bool {
        self.hotspot.is_known() && self.hotspot_heat > HOTSPOT_MIN_HEAT
    }

    pub fn hotspot(&self) -> Vec3 {
        self.hotspot
    }

    pub fn hotspot_heat(&self) -> f32 {
        self.hotspot_heat
    }

    pub fn heat_normalized(&self) -> f32 {
        self.heat_normalized
    }

    pub fn stage(&self) -> AttackStage {
        self.stage
    }

    pub fn cooldown_ready(&self) -> bool {
        !self.cooldown.is_active()
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown.remaining()
    }

    pub fn attack_in_progress(&self) -> bool {
        self.stage != AttackStage::Idle
    }

    pub fn strike_opportunity(&self) -> bool {
        self.has_hotspot() && self.cooldown_ready() && self.hotspot_heat >= STRIKE_HEAT_THRESHOLD
    }

    /// Eruptions fired since the block was installed.
    pub fn eruptions(&self) -> u32 {
        self.eruptions
    }

    fn begin_approach(&mut self) {
        if self.stage == AttackStage::Idle {
            self.stage = AttackStage::Approaching;
        }
    }

    fn begin_charge(&mut self, duration: f32) {
        if self.stage == AttackStage::Approaching {
            self.prep.latch(duration);
            self.stage = AttackStage::Charging;
        }
    }

    fn begin_roar(&mut self) {
        if self.stage == AttackStage::Charging {
            self.roar.latch(ROAR_SECONDS);
            self.stage = AttackStage::Roaring;
        }
    }

    /// Returns `false` unless this call moved the stage to `Erupting`.
    fn begin_eruption(&mut self, cooldown: f32) -> bool {
        if self.stage != AttackStage::Roaring {
            return false;
        }
        self.erupt.latch(ERUPT_SECONDS);
        self.cooldown.latch(cooldown);
        self.stage = AttackStage::Erupting;
        self.eruptions += 1;
        true
    }

    pub fn reset_attack(&mut self) {
        self.stage = AttackStage::Idle;
        self.prep.clear();
        self.roar.clear();
        self.erupt.clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SandWormModule;

impl<W> SpeciesModule<W> for SandWormModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::SandWorm
    }

    fn interest(&self) -> StimulusInterest {
        StimulusInterest {
            heat_events: true,
            noise_cues: false,
        }
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(SAND_WORM_FACTS, SandWormFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "SandWormRoot",
            vec![
                sequence(
                    "SandWormAttack",
                    vec![
                        condition("SandWormStrikeOpportunity", strike_opportunity),
                        action("SandWormStrikeAction", strike),
                    ],
                ),
                sequence(
                    "SandWormStalk",
                    vec![
                        condition("SandWormShouldStalk", has_hotspot),
                        action("SandWormStalkAction", stalk_hotspot),
                    ],
                ),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::SandWorm, root)
    }

    fn on_scan(
        &self,
        tick: &TickContext,
        report: &ScanReport,
        blackboard: &mut Blackboard,
        commons: &mut Commons,
    ) {
        register_heat(tick.tick, report, commons);
        if let Some(facts) = blackboard.block_mut(SAND_WORM_FACTS) {
            facts.refresh_hotspot(&commons.heat);
        }
    }
}

/// Write footsteps and item drops into the shared field, once per target and tick
/// however many worms observed them.
fn register_heat(tick: u64, report: &ScanReport, commons: &mut Commons) {
    let mut granted: BTreeMap<TargetId, bool> = BTreeMap::new();
    for stimulus in &report.stimuli {
        if !matches!(stimulus.kind, StimulusKind::Footstep | StimulusKind::ItemDrop) {
            continue;
        }
        let claimed = *granted
            .entry(stimulus.source)
            .or_insert_with(|| commons.claim_stimulus(stimulus.source, tick));
        if !claimed {
            continue;
        }
        match stimulus.kind {
            StimulusKind::Footstep => commons.heat.register_footstep(stimulus.position),
            StimulusKind::ItemDrop => commons.heat.register_item_drop(stimulus.position),
            StimulusKind::Noise { .. } => {}
        }
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b SandWormFacts> {
    ctx.blackboard.block(SAND_WORM_FACTS)
}

/// A strike already under way keeps the branch until it finishes or resets.
pub fn strike_opportunity<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(|f| f.attack_in_progress() || f.strike_opportunity())
}

pub fn has_hotspot<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(SandWormFacts::has_hotspot)
}

pub fn strike<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };

    if snapshot.stage == AttackStage::Erupting {
        if snapshot.erupt.is_active() {
            ctx.set_active_action("SandWormErupt");
            return BtStatus::Running;
        }
        update(ctx, SandWormFacts::reset_attack);
        return BtStatus::Success;
    }

    if !snapshot.has_hotspot() {
        update(ctx, SandWormFacts::reset_attack);
        return BtStatus::Failure;
    }

    let hotspot = snapshot.hotspot;
    let heat = snapshot.heat_normalized;
    let mut stage = snapshot.stage;
    if stage == AttackStage::Idle {
        update(ctx, SandWormFacts::begin_approach);
        stage = AttackStage::Approaching;
    }

    match stage {
        AttackStage::Approaching => {
            let approach_radius = lerp(4.0, 7.5, heat);
            if ctx.position().distance(hotspot) > approach_radius {
                let request = MoveRequest::new(hotspot, 8.0, 180.0, 11.0)
                    .acceleration(24.0)
                    .stopping_distance(1.25)
                    .allow_partial();
                return move_or_fail(ctx, "SandWormBurrow", request);
            }
            let windup = lerp(0.85, 2.5, 1.0 - heat);
            update(ctx, |f| f.begin_charge(windup));
            steer::halt(ctx, 0.0);
            ctx.set_active_action("SandWormCharge");
            BtStatus::Running
        }
        AttackStage::Charging => {
            if snapshot.prep.is_active() {
                ctx.set_active_action("SandWormCharge");
                return BtStatus::Running;
            }
            update(ctx, SandWormFacts::begin_roar);
            ctx.commons.heat.register_burst(hotspot, ROAR_BURST);
            ctx.world.shake_camera(CameraShake::Big);
            ctx.set_active_action("SandWormRoar");
            BtStatus::Running
        }
        AttackStage::Roaring => {
            if snapshot.roar.is_active() {
                ctx.set_active_action("SandWormRoar");
                return BtStatus::Running;
            }
            let cooldown = lerp(6.0, 10.0, heat);
            let fired = ctx
                .blackboard
                .block_mut(SAND_WORM_FACTS)
                .is_some_and(|f| f.begin_eruption(cooldown));
            if fired {
                erupt(ctx, hotspot, lerp(8.0, 14.0, heat));
                ctx.commons.heat.dampen(hotspot, DAMPEN_RADIUS);
            }
            ctx.set_active_action("SandWormErupt");
            BtStatus::Running
        }
        AttackStage::Idle | AttackStage::Erupting => BtStatus::Success,
    }
}

fn update<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut SandWormFacts)) {
    if let Some(facts) = ctx.blackboard.block_mut(SAND_WORM_FACTS) {
        apply(facts);
    }
}

/// Kill every exposed target within `radius` of the hotspot. Authoritative only.
fn erupt<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, hotspot: Vec3, radius: f32) {
    if !ctx.world.is_authoritative(ctx.agent) {
        return;
    }
    let victims: Vec<TargetId> = ctx
        .world
        .targets()
        .into_iter()
        .filter(|t| t.alive && !t.inside_facility && t.position.distance(hotspot) <= radius)
        .map(|t| t.id)
        .collect();
    for target in victims {
        debug!(agent = ctx.stable_id(), target = target.0, "eruption kill");
        ctx.world.kill_target(target, hotspot);
    }
    ctx.world.shake_camera(CameraShake::VeryStrong);
}

/// Circle the hotspot at a peripheral point, re-picked every few seconds.
pub fn stalk_hotspot<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let Some(snapshot) = facts(ctx).cloned() else {
        return BtStatus::Failure;
    };
    if !snapshot.has_hotspot() {
        return BtStatus::Failure;
    }

    let target = if snapshot.stalk_point.is_known() {
        snapshot.stalk_point
    } else {
        let mut rng = ctx.rng(0x5a3d);
        let point = peripheral_point(&mut rng, snapshot.hotspot, 8.0, 18.0);
        update(ctx, |f| {
            f.stalk_point = point;
            f.stalk_refresh.latch(STALK_REFRESH_SECONDS);
        });
        point
    };

    let request = MoveRequest::new(target, 6.0, 200.0, 5.5)
        .acceleration(9.0)
        .stopping_distance(1.5)
        .allow_partial();
    let status = move_or_fail(ctx, "SandWormStalk", request);
    if status == BtStatus::Failure {
        update(ctx, |f| {
            f.stalk_point = Vec3::UNKNOWN;
            f.stalk_refresh.clear();
        });
    }
    status
}

/// Random point on the XZ ring `[min_radius, max_radius)` around `center`.
pub fn peripheral_point<R: DeterministicRng>(rng: &mut R, center: Vec3, min_radius: f32, max_radius: f32) -> Vec3 {
    let radius = rng.next_f32_range(min_radius, max_radius);
    let mut direction = rng.inside_unit_circle();
    if direction.length_squared() < 1e-4 {
        direction = Vec3::FORWARD;
    }
    center + direction.normalized() * radius
}
