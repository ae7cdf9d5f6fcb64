mod support;

use instinct_bt::BtStatus;
use instinct_core::{FactBlock, TargetId, Vec3};
use instinct_nav::MotionActuator;
use instinct_species::coilhead::distance_to_path;
use instinct_species::{AnimationSignal, CoilheadFacts, CoilheadModule, COILHEAD_FACTS};
use support::{Harness, TestDoor};

fn coilhead_at(position: Vec3) -> Harness {
    Harness::new(&CoilheadModule, position)
}

fn facts(h: &Harness) -> &CoilheadFacts {
    h.blackboard.block(COILHEAD_FACTS).expect("installed")
}

/// Evaluate without moving, then advance the clock.
fn hold(h: &mut Harness) -> BtStatus {
    let status = h.evaluate();
    h.idle_step();
    status
}

#[test]
fn observation_freezes_and_the_buffer_outlives_it() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(15.5, 0.0, 5.5));
    h.world.observed = true;

    assert_eq!(hold(&mut h), BtStatus::Running);
    assert_eq!(h.last_action, Some("CoilheadFreeze"));
    hold(&mut h);
    assert_eq!(h.world.signals, vec![(1, AnimationSignal::Stop)]);
    assert!(facts(&h).frozen());
    assert!(!h.world.follower(1).has_path());
    assert_eq!(h.world.follower(1).settings().speed, 0.0);

    h.world.observed = false;
    let mut frozen_ticks = 0;
    for _ in 0..10 {
        hold(&mut h);
        if h.last_action != Some("CoilheadFreeze") {
            break;
        }
        frozen_ticks += 1;
    }
    assert!((2..=4).contains(&frozen_ticks), "froze for {frozen_ticks} ticks");
    assert_eq!(h.last_action, Some("CoilheadRapidApproach"));
    assert_eq!(
        h.world.signals,
        vec![(1, AnimationSignal::Stop), (1, AnimationSignal::Go)]
    );
    assert!(!facts(&h).frozen());
}

#[test]
fn chase_commits_an_unbraked_sprint_to_the_nearest_target() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(30.5, 0.0, 30.5));
    h.world.add_target(2, Vec3::new(15.5, 0.0, 5.5));

    assert_eq!(hold(&mut h), BtStatus::Running);
    assert_eq!(h.last_action, Some("CoilheadRapidApproach"));
    assert!(facts(&h).has_aggro());
    assert_eq!(facts(&h).target(), Vec3::new(15.5, 0.0, 5.5));

    let follower = h.world.follower(1);
    let settings = follower.settings();
    assert_eq!(settings.speed, 18.0);
    assert!(settings.acceleration >= 18.0 * 2.1);
    assert!(!settings.auto_braking);
    assert_eq!(settings.stopping_distance, 0.35);
    let end = follower.path().and_then(|p| p.end()).expect("chase path");
    assert!(end.distance(Vec3::new(15.5, 0.0, 5.5)) < 1e-4);
}

#[test]
fn remembered_target_is_chased_until_aggro_expires() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(15.5, 0.0, 5.5));
    hold(&mut h);
    h.world.untargetable.insert(TargetId(1));

    hold(&mut h);
    assert_eq!(h.last_action, Some("CoilheadRapidApproach"));

    for _ in 0..70 {
        hold(&mut h);
    }
    assert!(!facts(&h).has_aggro());
    assert_eq!(h.last_action, Some("CoilheadPatrol"));
}

#[test]
fn closed_door_on_the_path_is_breached_before_the_chase_resumes() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(5.5, 0.0, 20.5));
    h.world.doors.insert(
        7,
        TestDoor {
            position: Vec3::new(5.5, 0.0, 12.5),
            open: false,
            forced: 0,
        },
    );

    assert_eq!(hold(&mut h), BtStatus::Running);
    assert_eq!(h.last_action, Some("CoilheadDoorBreach"));
    assert!(facts(&h).breach().is_some());
    assert!(h.world.doors[&7].open);
    assert!(!h.world.follower(1).has_path());
    let (agent, facing) = h.world.facing[0];
    assert_eq!(agent, 1);
    assert!(facing.distance(Vec3::FORWARD) < 1e-4);

    let mut labels = Vec::new();
    for _ in 0..10 {
        hold(&mut h);
        labels.push(h.last_action);
        if h.last_action == Some("CoilheadRapidApproach") {
            break;
        }
    }
    assert_eq!(labels.last().copied().flatten(), Some("CoilheadRapidApproach"));
    assert!(labels.len() >= 4, "pause ended after {} ticks", labels.len());
    assert!(facts(&h).breach().is_none());
}

#[test]
fn open_door_on_the_path_does_not_stop_the_chase() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(5.5, 0.0, 20.5));
    h.world.doors.insert(
        7,
        TestDoor {
            position: Vec3::new(5.5, 0.0, 12.5),
            open: true,
            forced: 0,
        },
    );

    hold(&mut h);
    assert_eq!(h.last_action, Some("CoilheadRapidApproach"));
    assert_eq!(h.world.doors[&7].forced, 0);
}

#[test]
fn door_off_the_path_is_ignored() {
    let mut h = coilhead_at(Vec3::new(5.5, 0.0, 5.5));
    h.world.add_target(1, Vec3::new(5.5, 0.0, 20.5));
    h.world.doors.insert(
        7,
        TestDoor {
            position: Vec3::new(12.5, 0.0, 12.5),
            open: false,
            forced: 0,
        },
    );

    hold(&mut h);
    assert_eq!(h.last_action, Some("CoilheadRapidApproach"));
    assert!(!h.world.doors[&7].open);
}

#[test]
fn without_targets_it_patrols_its_territory() {
    let mut h = coilhead_at(Vec3::new(20.0, 0.0, 20.0));
    h.world.add_target(1, Vec3::new(25.0, 0.0, 20.0));
    h.world.untargetable.insert(TargetId(1));

    assert_eq!(hold(&mut h), BtStatus::Running);
    assert_eq!(h.last_action, Some("CoilheadPatrol"));
    let end = h.world.follower(1).path().and_then(|p| p.end()).expect("patrol path");
    assert!(end.distance(Vec3::new(20.0, 0.0, 20.0)) <= 5.0 + 1.5);
}

#[test]
fn distance_to_path_measures_the_closest_segment() {
    let path = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 10.0),
    ];
    assert!((distance_to_path(&path, Vec3::new(5.0, 0.0, 1.0)) - 1.0).abs() < 1e-5);
    assert!((distance_to_path(&path, Vec3::new(-3.0, 0.0, 0.0)) - 3.0).abs() < 1e-5);
    assert!((distance_to_path(&path, Vec3::new(11.0, 0.0, 5.0)) - 1.0).abs() < 1e-5);
    assert_eq!(distance_to_path(&path[..1], Vec3::ZERO), f32::INFINITY);
}

#[test]
fn short_sighting_never_cuts_aggro_memory() {
    let mut facts = CoilheadFacts::default();
    facts.set_target(Vec3::new(3.0, 0.0, 3.0), 6.0);
    facts.set_target(Vec3::new(4.0, 0.0, 4.0), 1.0);
    facts.decay(5.0);
    assert_eq!(facts.remembered_target(), Some(Vec3::new(4.0, 0.0, 4.0)));
    facts.decay(1.0);
    assert_eq!(facts.remembered_target(), None);
}
