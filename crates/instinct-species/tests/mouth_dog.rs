mod support;

use instinct_bt::BtStatus;
use instinct_core::{FactBlock, TargetId, TickContext, Vec3};
use instinct_nav::MotionActuator;
use instinct_sense::{ScanReport, Stimulus, StimulusKind};
use instinct_species::mouth_dog::CuePriority;
use instinct_species::{MouthDogFacts, MouthDogModule, SpeciesModule, MOUTH_DOG_FACTS};
use support::{Harness, TestWorld};

fn dog_at(position: Vec3) -> Harness {
    Harness::new(&MouthDogModule, position)
}

fn facts(h: &Harness) -> &MouthDogFacts {
    h.blackboard.block(MOUTH_DOG_FACTS).expect("installed")
}

fn facts_mut(h: &mut Harness) -> &mut MouthDogFacts {
    h.blackboard.block_mut(MOUTH_DOG_FACTS).expect("installed")
}

#[test]
fn weaker_cue_does_not_replace_a_remembered_one() {
    let mut facts = MouthDogFacts::default();
    let first = Vec3::new(1.0, 0.0, 1.0);
    facts.register_noise(first, 1.0, CuePriority::High);
    assert!(facts.consume_interrupt(CuePriority::High));
    assert!(!facts.consume_interrupt(CuePriority::High));

    facts.register_noise(Vec3::new(5.0, 0.0, 5.0), 0.5, CuePriority::High);
    assert_eq!(facts.slot(CuePriority::High).position, first);
    assert!(!facts.consume_interrupt(CuePriority::High));

    let close_enough = Vec3::new(9.0, 0.0, 9.0);
    facts.register_noise(close_enough, 0.97, CuePriority::High);
    assert_eq!(facts.slot(CuePriority::High).position, close_enough);
    assert!(facts.consume_interrupt(CuePriority::High));
}

#[test]
fn strength_is_clamped_and_unknown_positions_ignored() {
    let mut facts = MouthDogFacts::default();
    facts.register_noise(Vec3::UNKNOWN, 1.0, CuePriority::Low);
    assert!(!facts.has_cue(CuePriority::Low));

    facts.register_noise(Vec3::ZERO, 9.0, CuePriority::Low);
    let slot = facts.slot(CuePriority::Low);
    assert_eq!(slot.strength, 2.5);
    assert_eq!(slot.intensity(), 1.0);
    assert!((slot.memory.remaining() - 4.5).abs() < 1e-5);
}

#[test]
fn low_cues_are_remembered_longer_than_high_cues() {
    let mut facts = MouthDogFacts::default();
    facts.register_noise(Vec3::ZERO, 1.0, CuePriority::High);
    facts.register_noise(Vec3::ZERO, 1.0, CuePriority::Low);

    facts.decay(1.6);
    assert!(!facts.has_cue(CuePriority::High));
    assert_eq!(facts.slot(CuePriority::High).position, Vec3::UNKNOWN);
    assert!(facts.has_cue(CuePriority::Low));

    facts.decay(2.4);
    assert!(facts.has_cue(CuePriority::Low));
    facts.decay(0.5);
    assert!(!facts.has_cue(CuePriority::Low));
}

#[test]
fn scan_noise_lands_in_both_slots() {
    let module = MouthDogModule;
    let mut h = dog_at(Vec3::new(5.0, 0.0, 5.0));
    let cue = Vec3::new(12.0, 0.0, 5.0);
    let report = ScanReport {
        stimuli: vec![
            Stimulus {
                source: TargetId(1),
                position: cue,
                kind: StimulusKind::Noise { low: 0.25, high: 0.65 },
            },
            Stimulus {
                source: TargetId(1),
                position: cue,
                kind: StimulusKind::Footstep,
            },
        ],
        ..ScanReport::default()
    };
    SpeciesModule::<TestWorld>::on_scan(
        &module,
        &TickContext::new(0, 0.1, 0.0, 0),
        &report,
        &mut h.blackboard,
        &mut h.commons,
    );

    let dog = facts(&h);
    assert!(dog.has_cue(CuePriority::High));
    assert!(dog.has_cue(CuePriority::Low));
    assert_eq!(dog.slot(CuePriority::High).strength, 0.65);
    assert!(h.commons.heat.is_empty());
}

#[test]
fn high_cue_triggers_a_charge_and_its_cooldown() {
    let mut h = dog_at(Vec3::new(5.0, 0.0, 5.0));
    facts_mut(&mut h).register_noise(Vec3::new(15.0, 0.0, 5.0), 2.5, CuePriority::High);

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("MouthDogCharge"));
    assert!(!facts(&h).charge_ready());
    assert!(!facts_mut(&mut h).consume_interrupt(CuePriority::High));
    assert!((h.world.follower(1).settings().speed - 12.5).abs() < 1e-5);
}

#[test]
fn charge_cooldown_falls_back_to_investigating() {
    let mut h = dog_at(Vec3::new(5.0, 0.0, 5.0));
    {
        let dog = facts_mut(&mut h);
        dog.register_noise(Vec3::new(15.0, 0.0, 5.0), 1.0, CuePriority::High);
        dog.register_noise(Vec3::new(5.0, 0.0, 15.0), 0.5, CuePriority::Low);
        dog.begin_charge_cooldown(5.0);
    }

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("MouthDogInvestigate"));
}

#[test]
fn reaching_the_cue_clears_it() {
    let spot = Vec3::new(5.0, 0.0, 5.0);
    let mut h = dog_at(spot);
    facts_mut(&mut h).register_noise(spot, 0.5, CuePriority::Low);

    assert_eq!(h.step(), BtStatus::Success);
    assert!(!facts(&h).has_cue(CuePriority::Low));
}

#[test]
fn silence_means_prowling() {
    let mut h = dog_at(Vec3::new(20.0, 0.0, 20.0));
    assert_eq!(h.evaluate(), BtStatus::Running);
    assert_eq!(h.last_action, Some("MouthDogProwl"));
    assert!(h.world.follower(1).has_path());
}

#[test]
fn shorter_cooldown_never_cuts_a_running_one() {
    let mut facts = MouthDogFacts::default();
    facts.begin_charge_cooldown(2.0);
    facts.begin_charge_cooldown(0.5);
    facts.decay(1.0);
    assert!(!facts.charge_ready());
    facts.decay(1.0);
    assert!(facts.charge_ready());
}
