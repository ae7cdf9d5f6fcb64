//! Mouth dog: blind, hunts by ear.
//!
//! Noise cues land in two slots. A high-priority cue triggers a charge, a
//! low-priority one an investigation, and silence leaves the dog prowling. A fresh
//! cue that replaces a slot interrupts whatever path the dog was on.

use instinct_bt::{action, condition, selector, sequence, BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    clamp01, lerp, Blackboard, BlockKey, Commons, DeterministicRng, FactBlock, LatchTimer,
    Species, TickContext, Vec3,
};
use instinct_nav::MoveRequest;
use instinct_sense::{ScanReport, StimulusInterest, StimulusKind};

use crate::steer::{self, move_or_fail, move_to, spread};
use crate::{InstinctWorld, SpeciesModule};

pub const MOUTH_DOG_FACTS: BlockKey<MouthDogFacts> = BlockKey::new(3);

pub const MAX_STIMULUS_STRENGTH: f32 = 2.5;
/// A weaker cue still replaces the remembered one within this margin.
const REPLACE_MARGIN: f32 = 0.05;
const LOW_MEMORY_DECAY_RATE: f32 = 0.65;
const ROAM_RADIUS: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CuePriority {
    High,
    Low,
}

/// One remembered noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSlot {
    pub position: Vec3,
    pub strength: f32,
    pub memory: LatchTimer,
    interrupt: bool,
}

impl Default for NoiseSlot {
    fn default() -> Self {
        Self {
            position: Vec3::UNKNOWN,
            strength: 0.0,
            memory: LatchTimer::new(),
            interrupt: false,
        }
    }
}

impl NoiseSlot {
    pub fn is_active(&self) -> bool {
        self.memory.is_active()
    }

    pub fn intensity(&self) -> f32 {
        clamp01(self.strength / MAX_STIMULUS_STRENGTH)
    }

    fn register(&mut self, position: Vec3, strength: f32, memory: f32) {
        if strength >= self.strength - REPLACE_MARGIN || !self.memory.is_active() {
            self.position = position;
            self.strength = strength;
            self.interrupt = true;
        }
        self.memory.latch(memory);
    }

    fn decay(&mut self, amount: f32) {
        if !self.memory.is_active() {
            return;
        }
        self.memory.decay(amount);
        if !self.memory.is_active() {
            *self = Self::default();
        }
    }

    fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouthDogFacts {
    high: NoiseSlot,
    low: NoiseSlot,
    charge_cooldown: LatchTimer,
    roam_point: Vec3,
    roam_timer: LatchTimer,
}

impl Default for MouthDogFacts {
    fn default() -> Self {
        Self {
            high: NoiseSlot::default(),
            low: NoiseSlot::default(),
            charge_cooldown: LatchTimer::new(),
            roam_point: Vec3::UNKNOWN,
            roam_timer: LatchTimer::new(),
        }
    }
}

impl FactBlock for MouthDogFacts {
    fn name(&self) -> &'static str {
        "mouth_dog"
    }

    fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.high.decay(dt);
        self.low.decay(dt * LOW_MEMORY_DECAY_RATE);
        self.charge_cooldown.decay(dt);
        if self.roam_timer.is_active() {
            self.roam_timer.decay(dt);
            if !self.roam_timer.is_active() {
                self.roam_point = Vec3::UNKNOWN;
            }
        }
    }
}

impl MouthDogFacts {
    /// Remember a cue. Strength is clamped to `[0, MAX_STIMULUS_STRENGTH]`; memory grows
    /// with it and never shrinks on registration.
    pub fn register_noise(&mut self, position: Vec3, strength: f32, priority: CuePriority) {
        if !position.is_known() || !strength.is_finite() {
            return;
        }
        let strength = strength.clamp(0.0, MAX_STIMULUS_STRENGTH);
        let t = strength / MAX_STIMULUS_STRENGTH;
        match priority {
            CuePriority::High => self.high.register(position, strength, lerp(0.9, 2.4, t)),
            CuePriority::Low => self.low.register(position, strength, lerp(1.8, 4.5, t)),
        }
    }

    pub fn slot(&self, priority: CuePriority) -> &NoiseSlot {
        match priority {
            CuePriority::High => &self.high,
            CuePriority::Low => &self.low,
        }
    }

    fn slot_mut(&mut self, priority: CuePriority) -> &mut NoiseSlot {
        match priority {
            CuePriority::High => &mut self.high,
            CuePriority::Low => &mut self.low,
        }
    }

    pub fn has_cue(&self, priority: CuePriority) -> bool {
        self.slot(priority).is_active()
    }

    /// Whether a replacement happened since the last call.
    pub fn consume_interrupt(&mut self, priority: CuePriority) -> bool {
        self.slot_mut(priority).take_interrupt()
    }

    pub fn clear_cue(&mut self, priority: CuePriority) {
        *self.slot_mut(priority) = NoiseSlot::default();
    }

    pub fn charge_ready(&self) -> bool {
        !self.charge_cooldown.is_active()
    }

    pub fn begin_charge_cooldown(&mut self, seconds: f32) {
        self.charge_cooldown.latch(seconds);
    }

    /// Current roam point, or a new one within six meters of `origin` that holds for
    /// 0.8 to 1.6 seconds.
    pub fn roam_point<R: DeterministicRng>(&mut self, origin: Vec3, rng: &mut R) -> Vec3 {
        if self.roam_timer.is_active() && self.roam_point.is_known() {
            return self.roam_point;
        }
        let offset = rng.inside_unit_circle() * ROAM_RADIUS;
        self.roam_point = origin + offset;
        self.roam_timer.latch(rng.next_f32_range(0.8, 1.6));
        self.roam_point
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MouthDogModule;

impl<W> SpeciesModule<W> for MouthDogModule
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species {
        Species::MouthDog
    }

    fn interest(&self) -> StimulusInterest {
        StimulusInterest {
            heat_events: false,
            noise_cues: true,
        }
    }

    fn install_facts(&self, blackboard: &mut Blackboard) {
        blackboard.install(MOUTH_DOG_FACTS, MouthDogFacts::default());
    }

    fn build_tree(&self) -> BehaviorTree<W> {
        let root = selector(
            "MouthDogRoot",
            vec![
                sequence(
                    "MouthDogCharge",
                    vec![
                        condition("MouthDogHighNoise", has_high_cue),
                        action("MouthDogChargeAction", charge_high_noise),
                    ],
                ),
                sequence(
                    "MouthDogInvestigate",
                    vec![
                        condition("MouthDogLowNoise", should_investigate),
                        action("MouthDogInvestigateAction", investigate_noise),
                    ],
                ),
                action("MouthDogProwlAction", prowl),
                action("Idle", steer::idle),
            ],
        );
        BehaviorTree::new(Species::MouthDog, root)
    }

    fn on_scan(
        &self,
        _tick: &TickContext,
        report: &ScanReport,
        blackboard: &mut Blackboard,
        _commons: &mut Commons,
    ) {
        let Some(facts) = blackboard.block_mut(MOUTH_DOG_FACTS) else {
            return;
        };
        for stimulus in &report.stimuli {
            if let StimulusKind::Noise { low, high } = stimulus.kind {
                if high > 0.0 {
                    facts.register_noise(stimulus.position, high, CuePriority::High);
                }
                if low > 0.0 {
                    facts.register_noise(stimulus.position, low, CuePriority::Low);
                }
            }
        }
    }
}

fn facts<'b, W: InstinctWorld>(ctx: &'b EvalContext<'_, W>) -> Option<&'b MouthDogFacts> {
    ctx.blackboard.block(MOUTH_DOG_FACTS)
}

fn update<W: InstinctWorld, R>(ctx: &mut EvalContext<'_, W>, apply: impl FnOnce(&mut MouthDogFacts) -> R) -> Option<R> {
    ctx.blackboard.block_mut(MOUTH_DOG_FACTS).map(apply)
}

pub fn has_high_cue<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(|f| f.has_cue(CuePriority::High) && f.charge_ready())
}

pub fn should_investigate<W: InstinctWorld>(ctx: &EvalContext<'_, W>) -> bool {
    facts(ctx).is_some_and(|f| f.has_cue(CuePriority::Low))
}

/// Drop any in-flight path when the slot was replaced since the last visit.
fn apply_interrupt<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>, priority: CuePriority) {
    if update(ctx, |f| f.consume_interrupt(priority)) == Some(true) {
        if let Some(actuator) = ctx.world.actuator_mut(ctx.agent) {
            actuator.reset_path();
        }
    }
}

pub fn charge_high_noise<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    if !facts(ctx).is_some_and(|f| f.has_cue(CuePriority::High)) {
        return BtStatus::Failure;
    }
    apply_interrupt(ctx, CuePriority::High);

    let Some(cue) = facts(ctx).map(|f| *f.slot(CuePriority::High)) else {
        return BtStatus::Failure;
    };
    if ctx.position().distance(cue.position) <= 0.75 {
        update(ctx, |f| f.clear_cue(CuePriority::High));
        return BtStatus::Success;
    }

    let intensity = cue.intensity();
    let request = MoveRequest::new(cue.position, 3.5, 60.0, lerp(8.0, 12.5, intensity))
        .acceleration(lerp(18.0, 30.0, intensity))
        .stopping_distance(0.1)
        .allow_partial();
    if !move_to(ctx, "MouthDogCharge", request) {
        return BtStatus::Failure;
    }
    update(ctx, |f| f.begin_charge_cooldown(lerp(0.35, 0.85, intensity)));
    BtStatus::Running
}

pub fn investigate_noise<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    if !should_investigate(ctx) {
        return BtStatus::Failure;
    }
    apply_interrupt(ctx, CuePriority::Low);

    let Some(cue) = facts(ctx).map(|f| *f.slot(CuePriority::Low)) else {
        return BtStatus::Failure;
    };
    if ctx.position().distance(cue.position) <= 0.9 {
        update(ctx, |f| f.clear_cue(CuePriority::Low));
        return BtStatus::Success;
    }

    let intensity = cue.intensity().max(0.2);
    let request = MoveRequest::new(cue.position, 3.0, 50.0, lerp(4.25, 7.25, intensity))
        .acceleration(lerp(9.0, 18.0, intensity))
        .stopping_distance(0.35)
        .allow_partial();
    move_or_fail(ctx, "MouthDogInvestigate", request)
}

pub fn prowl<W: InstinctWorld>(ctx: &mut EvalContext<'_, W>) -> BtStatus {
    let origin = ctx.position();
    let mut rng = ctx.rng(0xd06);
    let Some(roam) = update(ctx, |f| f.roam_point(origin, &mut rng)) else {
        return BtStatus::Failure;
    };
    let target = roam + spread(ctx, 0.65);

    let request = MoveRequest::new(target, 4.0, 30.0, 4.25)
        .acceleration(8.5)
        .stopping_distance(0.6)
        .allow_partial();
    move_or_fail(ctx, "MouthDogProwl", request)
}
