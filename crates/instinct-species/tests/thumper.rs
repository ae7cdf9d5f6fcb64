mod support;

use instinct_bt::BtStatus;
use instinct_core::{Elapsed, FactBlock, Vec3};
use instinct_nav::MotionActuator;
use instinct_species::thumper::{CHARGE_SECONDS, CHARGE_COOLDOWN_SECONDS};
use instinct_species::{ChargeState, ThumperFacts, ThumperModule, THUMPER_FACTS};
use proptest::prelude::*;
use support::Harness;

fn thumper_at(position: Vec3) -> Harness {
    Harness::new(&ThumperModule, position)
}

fn facts(h: &Harness) -> &ThumperFacts {
    h.blackboard.block(THUMPER_FACTS).expect("installed")
}

fn facts_mut(h: &mut Harness) -> &mut ThumperFacts {
    h.blackboard.block_mut(THUMPER_FACTS).expect("installed")
}

#[test]
fn charge_line_is_locked_when_priming_starts() {
    let mut h = thumper_at(Vec3::new(5.5, 0.0, 5.5));
    h.see_player(Vec3::new(5.5, 0.0, 12.5));
    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(facts(&h).state(), ChargeState::Priming);
    assert_eq!(h.last_action, Some("ThumperPrime"));

    let locked = facts(&h).charge_destination();
    assert!(locked.distance(Vec3::new(5.5, 0.0, 18.5)) < 1e-4);

    let sidestep = Vec3::new(15.5, 0.0, 5.5);
    for _ in 0..20 {
        if facts(&h).state() == ChargeState::Charging {
            break;
        }
        h.see_player(sidestep);
        h.step();
        assert_eq!(facts(&h).charge_destination(), locked);
    }

    assert_eq!(facts(&h).state(), ChargeState::Charging);
    assert_eq!(h.last_action, Some("ThumperCharge"));
    assert!(facts(&h).cooldown_remaining() > CHARGE_SECONDS);
    let end = h.world.follower(1).path().and_then(|p| p.end()).expect("charge path");
    assert!(end.distance(locked) < 1e-4);
}

#[test]
fn cooldown_outlasts_charge_and_recovery() {
    let mut facts = ThumperFacts::default();
    let own = Vec3::ZERO;
    let target = Vec3::new(0.0, 0.0, 5.0);

    assert!(facts.prime(own, target));
    assert!(!facts.prime(own, target));
    facts.decay(1.0);
    assert!(facts.ready_to_burst());

    facts.begin_charge(CHARGE_SECONDS);
    assert!((facts.cooldown_remaining() - CHARGE_COOLDOWN_SECONDS).abs() < 1e-5);
    facts.decay(CHARGE_SECONDS + 0.01);
    assert_eq!(facts.state(), ChargeState::Recovering);
    assert!(facts.needs_recovery());

    facts.decay(0.5);
    assert_eq!(facts.state(), ChargeState::Idle);
    assert!(facts.cooldown_remaining() > 0.0);
    assert!(!facts.can_prime());
    assert!(!facts.prime(own, target));

    facts.decay(0.3);
    assert!(facts.can_prime());
}

#[test]
fn degenerate_aim_falls_back_to_forward() {
    let mut facts = ThumperFacts::default();
    let own = Vec3::new(2.0, 0.0, 2.0);
    assert!(facts.prime(own, own));
    assert_eq!(facts.charge_direction(), Vec3::FORWARD);
    assert!(facts.charge_destination().distance(Vec3::new(2.0, 0.0, 10.0)) < 1e-5);
}

#[test]
fn active_cooldown_refuses_a_new_windup() {
    let mut h = thumper_at(Vec3::new(20.0, 0.0, 20.0));
    facts_mut(&mut h).hold_cooldown(2.0);
    h.see_player(Vec3::new(20.0, 0.0, 26.0));

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(facts(&h).state(), ChargeState::Idle);
    assert_eq!(h.last_action, Some("ThumperPatrol"));
}

#[test]
fn wall_ahead_of_the_charge_is_an_impact() {
    let mut h = thumper_at(Vec3::new(5.5, 0.0, 8.5));
    for x in 0..40 {
        h.world.grid.set_blocked(x, 9, true);
    }

    let mut impacted = false;
    for _ in 0..20 {
        h.see_player(Vec3::new(5.5, 0.0, 15.5));
        h.step();
        if h.last_action == Some("ThumperImpact") {
            impacted = true;
            break;
        }
    }
    assert!(impacted);
    assert_eq!(facts(&h).state(), ChargeState::Recovering);
    assert!(facts(&h).needs_recovery());

    h.step();
    assert_eq!(h.last_action, Some("ThumperRecover"));
    assert_eq!(h.world.follower(1).settings().speed, 0.0);
    assert!(!h.world.follower(1).has_path());
}

#[test]
fn remembered_sighting_is_tracked_then_predicted() {
    let mut h = thumper_at(Vec3::new(5.5, 0.0, 5.5));
    let last_seen = Vec3::new(15.5, 0.0, 5.5);
    {
        let player = &mut h.blackboard.player;
        player.last_known_position = last_seen;
        player.visible = false;
        player.time_since_seen = Elapsed::zero();
        player.time_since_seen.advance(1.0);
    }

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("ThumperTrack"));

    let mut at_sighting = thumper_at(last_seen);
    at_sighting.blackboard.player = h.blackboard.player;
    assert_eq!(at_sighting.step(), BtStatus::Running);
    assert_eq!(at_sighting.last_action, Some("ThumperPredict"));
    let sprint = facts(&at_sighting).sprint_target();
    assert!(sprint.is_known());
    assert!(sprint.distance(last_seen) >= 2.0);
}

#[test]
fn stale_memory_falls_through_to_patrol() {
    let mut h = thumper_at(Vec3::new(20.0, 0.0, 20.0));
    {
        let player = &mut h.blackboard.player;
        player.last_known_position = Vec3::new(25.0, 0.0, 20.0);
        player.time_since_seen = Elapsed::zero();
        player.time_since_seen.advance(9.0);
    }

    assert_eq!(h.step(), BtStatus::Running);
    assert_eq!(h.last_action, Some("ThumperPatrol"));
    let patrol = facts(&h).patrol_target();
    assert!(patrol.is_known());
    assert!(h.world.grid.is_walkable(patrol));
}

proptest! {
    #[test]
    fn any_positive_cooldown_refuses_priming(cooldown in f32::MIN_POSITIVE..1.0e6f32) {
        let mut facts = ThumperFacts::default();
        facts.hold_cooldown(cooldown);
        prop_assert!(!facts.can_prime());
        prop_assert!(!facts.prime(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)));
        prop_assert_eq!(facts.state(), ChargeState::Idle);
    }

    // The harness decays one 0.1 s tick before the tree runs.
    #[test]
    fn tree_never_winds_up_while_cooling_down(cooldown in 0.11f32..1.0e4) {
        let mut h = thumper_at(Vec3::new(20.0, 0.0, 20.0));
        facts_mut(&mut h).hold_cooldown(cooldown);
        h.see_player(Vec3::new(20.0, 0.0, 26.0));

        prop_assert_ne!(h.step(), BtStatus::Failure);
        prop_assert_eq!(facts(&h).state(), ChargeState::Idle);
        prop_assert_ne!(h.last_action, Some("ThumperPrime"));
    }
}

#[test]
fn stun_recovery_is_not_shortened_by_a_plain_stop() {
    let mut facts = ThumperFacts::default();
    assert!(facts.prime(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)));
    facts.begin_charge(CHARGE_SECONDS);
    facts.stop_charge(true);
    facts.stop_charge(false);
    facts.decay(0.9);
    assert!(facts.needs_recovery());
    facts.decay(0.2);
    assert_eq!(facts.state(), ChargeState::Idle);
}
