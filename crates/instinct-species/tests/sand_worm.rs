mod support;

use instinct_bt::BtStatus;
use instinct_core::{Blackboard, Commons, TargetId, Territory, TickContext, Vec3};
use instinct_nav::MotionActuator;
use instinct_sense::{ScanReport, Stimulus, StimulusKind};
use instinct_species::{
    AttackStage, CameraShake, SandWormFacts, SandWormModule, SpeciesModule, SAND_WORM_FACTS,
};
use support::{Harness, TestWorld};

fn worm_at(position: Vec3) -> Harness {
    Harness::new(&SandWormModule, position)
}

fn refresh(h: &mut Harness) {
    let field = &h.commons.heat;
    if let Some(facts) = h.blackboard.block_mut(SAND_WORM_FACTS) {
        facts.refresh_hotspot(field);
    }
}

fn facts(h: &Harness) -> &SandWormFacts {
    h.blackboard.block(SAND_WORM_FACTS).expect("installed")
}

fn footstep_report(position: Vec3) -> ScanReport {
    ScanReport {
        stimuli: vec![Stimulus {
            source: TargetId(1),
            position,
            kind: StimulusKind::Footstep,
        }],
        ..ScanReport::default()
    }
}

#[test]
fn footsteps_heat_the_field_once_per_target_and_tick() {
    let module = SandWormModule;
    let mut commons = Commons::default();
    let mut first = Blackboard::new(Territory::new(Vec3::ZERO, 10.0));
    let mut second = Blackboard::new(Territory::new(Vec3::ZERO, 10.0));
    SpeciesModule::<TestWorld>::install_facts(&module, &mut first);
    SpeciesModule::<TestWorld>::install_facts(&module, &mut second);

    let spot = Vec3::new(3.0, 0.0, 3.0);
    let report = footstep_report(spot);
    let tick = TickContext::new(4, 0.1, 0.4, 1);

    SpeciesModule::<TestWorld>::on_scan(&module, &tick, &report, &mut first, &mut commons);
    SpeciesModule::<TestWorld>::on_scan(&module, &tick, &report, &mut second, &mut commons);
    assert!((commons.heat.heat_at(spot) - 1.0).abs() < 1e-5);

    let next = tick.next(0.1);
    SpeciesModule::<TestWorld>::on_scan(&module, &next, &report, &mut second, &mut commons);
    assert!((commons.heat.heat_at(spot) - 2.0).abs() < 1e-5);

    let worm = second.block(SAND_WORM_FACTS).expect("installed");
    assert!(worm.has_hotspot());
    assert!((worm.hotspot_heat() - 2.0).abs() < 1e-5);
}

#[test]
fn cold_field_leaves_the_worm_idle() {
    let mut h = worm_at(Vec3::new(10.0, 0.0, 10.0));
    refresh(&mut h);
    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("Idle"));
    assert_eq!(facts(&h).stage(), AttackStage::Idle);
}

#[test]
fn warm_field_below_the_strike_threshold_is_stalked() {
    let mut h = worm_at(Vec3::new(10.0, 0.0, 10.0));
    h.commons.heat.add_heat(Vec3::new(20.0, 0.0, 20.0), 3.0);
    refresh(&mut h);

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("SandWormStalk"));
    assert_eq!(facts(&h).stage(), AttackStage::Idle);
    assert!(h.world.follower(1).path().is_some());
}

#[test]
fn strike_runs_every_stage_in_order_and_erupts_once() {
    let mut h = worm_at(Vec3::new(10.0, 0.0, 10.0));
    h.world.add_target(2, Vec3::new(12.0, 0.0, 10.0));
    h.world.add_target(3, Vec3::new(11.0, 0.0, 9.0));
    h.world.targets[1].inside_facility = true;
    h.world.add_target(4, Vec3::new(35.0, 0.0, 35.0));
    h.commons.heat.add_heat(Vec3::new(10.0, 0.0, 10.0), 20.0);

    let mut stages = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..100 {
        refresh(&mut h);
        h.step();
        stages.push(facts(&h).stage());
        labels.push(h.last_action);
    }

    for pair in stages.windows(2) {
        let forward = pair[1] >= pair[0];
        let finished = pair[0] == AttackStage::Erupting && pair[1] == AttackStage::Idle;
        assert!(forward || finished, "stage went {:?} -> {:?}", pair[0], pair[1]);
    }
    for stage in [
        AttackStage::Charging,
        AttackStage::Roaring,
        AttackStage::Erupting,
    ] {
        assert!(stages.contains(&stage), "never reached {stage:?}");
    }
    assert_eq!(stages.last().copied(), Some(AttackStage::Idle));

    let worm = facts(&h);
    assert_eq!(worm.eruptions(), 1);
    assert!(!worm.cooldown_ready());
    assert_eq!(h.world.killed, vec![TargetId(2)]);
    assert_eq!(h.world.shakes, vec![CameraShake::Big, CameraShake::VeryStrong]);
    assert!(labels.contains(&Some("SandWormRoar")));
    assert!(labels.contains(&Some("SandWormErupt")));
}

#[test]
fn non_authoritative_host_erupts_without_killing() {
    let mut h = worm_at(Vec3::new(10.0, 0.0, 10.0));
    h.world.authoritative = false;
    h.world.add_target(2, Vec3::new(11.0, 0.0, 10.0));
    h.commons.heat.add_heat(Vec3::new(10.0, 0.0, 10.0), 20.0);

    for _ in 0..80 {
        refresh(&mut h);
        h.step();
    }
    assert_eq!(facts(&h).eruptions(), 1);
    assert!(h.world.killed.is_empty());
    assert!(h.world.targets[0].alive);
}

#[test]
fn distant_hotspot_is_approached_by_burrowing() {
    let mut h = worm_at(Vec3::new(4.0, 0.0, 4.0));
    h.commons.heat.add_heat(Vec3::new(30.0, 0.0, 30.0), 20.0);
    refresh(&mut h);

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("SandWormBurrow"));
    assert_eq!(facts(&h).stage(), AttackStage::Approaching);
    assert!((h.world.follower(1).settings().speed - 11.0).abs() < 1e-5);
}

#[test]
fn losing_the_hotspot_mid_strike_resets_the_attack() {
    let mut h = worm_at(Vec3::new(4.0, 0.0, 4.0));
    h.commons.heat.add_heat(Vec3::new(30.0, 0.0, 30.0), 20.0);
    refresh(&mut h);
    h.step();
    assert_eq!(facts(&h).stage(), AttackStage::Approaching);

    h.commons.heat.clear();
    refresh(&mut h);
    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(facts(&h).stage(), AttackStage::Idle);
    assert_eq!(h.last_action, Some("Idle"));
}
