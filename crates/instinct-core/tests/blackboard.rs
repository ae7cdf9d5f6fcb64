use instinct_core::{
    AllySighting, BalanceProfile, BehaviorMode, Blackboard, BlockKey, FactBlock, LatchTimer,
    Species, TargetId, Territory, Vec3,
};

#[derive(Debug, Default)]
struct Anger {
    meter: LatchTimer,
    decays: u32,
}

impl FactBlock for Anger {
    fn name(&self) -> &'static str {
        "anger"
    }

    fn decay(&mut self, dt: f32) {
        self.meter.decay(dt);
        self.decays += 1;
    }
}

const ANGER: BlockKey<Anger> = BlockKey::new(7);

fn board_far_from_territory() -> Blackboard {
    Blackboard::new(Territory::new(Vec3::new(500.0, 0.0, 500.0), 12.0))
}

#[test]
fn fresh_blackboard_uses_unknown_sentinels() {
    let bb = board_far_from_territory();
    assert!(!bb.player.last_known_position.is_known());
    assert_eq!(bb.player.last_known_forward, Vec3::FORWARD);
    assert!(bb.player.distance.is_infinite());
    assert!(bb.player.time_since_seen.seconds().is_infinite());
    assert!(bb.time_since_lure().is_infinite());
    assert!(!bb.pack.center.is_known());
}

#[test]
fn update_player_info_resets_time_since_seen_only_when_visible() {
    let mut bb = board_far_from_territory();
    let target = TargetId(1);
    bb.update_player_info(target, Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0), Vec3::FORWARD, true, 2.0, 0.1);
    assert_eq!(bb.player.distance, 5.0);
    assert_eq!(bb.player.noise, 1.0);
    assert_eq!(bb.player.time_since_seen.seconds(), 0.0);

    bb.update_player_info(target, Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0), Vec3::ZERO, false, -1.0, 0.5);
    assert_eq!(bb.player.noise, 0.0);
    assert!((bb.player.time_since_seen.seconds() - 0.5).abs() < 1e-6);
    // Tiny forward vectors keep the previous facing.
    assert_eq!(bb.player.last_known_forward, Vec3::FORWARD);
}

#[test]
fn non_finite_target_position_means_infinite_distance() {
    let mut bb = board_far_from_territory();
    bb.update_player_info(TargetId(1), Vec3::ZERO, Vec3::UNKNOWN, Vec3::FORWARD, true, 0.0, 0.1);
    assert!(bb.player.distance.is_infinite());
}

#[test]
fn mark_target_lost_keeps_last_known_position() {
    let mut bb = board_far_from_territory();
    let seen_at = Vec3::new(2.0, 0.0, 2.0);
    bb.update_player_info(TargetId(9), Vec3::ZERO, seen_at, Vec3::FORWARD, true, 0.3, 0.1);
    bb.mark_target_lost(0.25);
    bb.mark_target_lost(0.25);

    assert!(!bb.player.visible);
    assert_eq!(bb.player.target, None);
    assert!(bb.player.distance.is_infinite());
    assert_eq!(bb.player.last_known_position, seen_at);
    assert!((bb.player.time_since_seen.seconds() - 0.5).abs() < 1e-6);
}

#[test]
fn allies_centroid_is_unknown_when_alone() {
    let mut bb = board_far_from_territory();
    bb.update_allies(vec![
        AllySighting { id: 2, species: Species::Generic, position: Vec3::new(2.0, 0.0, 0.0), forward: Vec3::FORWARD },
        AllySighting { id: 3, species: Species::Generic, position: Vec3::new(0.0, 0.0, 4.0), forward: Vec3::FORWARD },
    ]);
    assert_eq!(bb.pack.center, Vec3::new(1.0, 0.0, 2.0));

    bb.update_allies(Vec::new());
    assert!(bb.pack.allies.is_empty());
    assert!(!bb.pack.center.is_known());
}

#[test]
fn advance_timers_runs_once_per_tick_and_decays_every_block() {
    let mut bb = board_far_from_territory();
    let mut anger = Anger::default();
    anger.meter.latch(1.0);
    bb.install(ANGER, anger);

    assert!(bb.advance_timers(1, 0.25));
    assert!(!bb.advance_timers(1, 0.25));
    assert!(bb.advance_timers(2, 0.25));

    let anger = bb.block(ANGER).expect("installed");
    assert_eq!(anger.decays, 2);
    assert!((anger.meter.remaining() - 0.5).abs() < 1e-6);
    assert!(!bb.advance_timers(0, 0.25));
}

#[test]
fn advance_timers_does_not_advance_time_since_seen() {
    let mut bb = board_far_from_territory();
    bb.update_player_info(TargetId(1), Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::FORWARD, true, 0.0, 0.1);
    bb.mark_target_lost(0.1);
    bb.advance_timers(1, 0.1);
    assert!((bb.player.time_since_seen.seconds() - 0.1).abs() < 1e-6);
}

#[test]
#[should_panic(expected = "fact block type mismatch")]
fn fact_block_type_mismatch_panics() {
    #[derive(Default)]
    struct Other;
    impl FactBlock for Other {
        fn name(&self) -> &'static str {
            "other"
        }
        fn decay(&mut self, _dt: f32) {}
    }

    let mut bb = board_far_from_territory();
    bb.install(ANGER, Anger::default());
    let _ = bb.block(BlockKey::<Other>::new(7));
}

#[test]
fn territory_falls_back_to_agent_position_when_target_unknown() {
    let bb = Blackboard::new(Territory::new(Vec3::ZERO, 10.0));
    assert!(bb.player_inside_territory(Vec3::new(3.0, 0.0, 0.0)));
    assert!(!bb.player_inside_territory(Vec3::new(30.0, 0.0, 0.0)));
}

#[test]
fn territory_uses_target_when_known() {
    let mut bb = Blackboard::new(Territory::new(Vec3::ZERO, 10.0));
    bb.update_player_info(TargetId(1), Vec3::new(1.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0), Vec3::FORWARD, true, 0.0, 0.1);
    assert!(!bb.player_inside_territory(Vec3::new(1.0, 0.0, 0.0)));
}

#[test]
fn hunt_is_chosen_at_distance_25_and_8_without_hysteresis() {
    let profile = BalanceProfile::default();
    let mut bb = board_far_from_territory();
    let agent = Vec3::ZERO;

    bb.update_player_info(TargetId(1), agent, Vec3::new(25.0, 0.0, 0.0), Vec3::FORWARD, true, 0.0, 0.1);
    assert_eq!(bb.mode(agent, &profile), BehaviorMode::Hunt);

    bb.update_player_info(TargetId(1), agent, Vec3::new(8.0, 0.0, 0.0), Vec3::FORWARD, true, 0.0, 0.1);
    assert_eq!(bb.mode(agent, &profile), BehaviorMode::Hunt);
    assert!(bb.should_stalk(&profile));
}

#[test]
fn swarm_needs_two_allies_and_a_recent_cue() {
    let profile = BalanceProfile::default();
    let mut bb = board_far_from_territory();
    let ally = |id| AllySighting { id, species: Species::Generic, position: Vec3::new(1.0, 0.0, 1.0), forward: Vec3::FORWARD };
    bb.update_allies(vec![ally(2), ally(3)]);
    assert!(!bb.should_swarm());

    bb.update_player_info(TargetId(1), Vec3::ZERO, Vec3::new(60.0, 0.0, 0.0), Vec3::FORWARD, false, 0.5, 0.1);
    assert!(bb.should_swarm());
    assert_eq!(bb.mode(Vec3::ZERO, &profile), BehaviorMode::Pack);
}

#[test]
fn lure_waits_for_cooldown_after_reset() {
    let profile = BalanceProfile::default();
    let mut bb = board_far_from_territory();
    assert!(bb.should_lure(&profile));

    bb.reset_lure_timer();
    assert!(!bb.should_lure(&profile));
    for tick in 1..=26 {
        bb.advance_timers(tick, 1.0);
    }
    assert!(bb.should_lure(&profile));
    assert_eq!(bb.mode(Vec3::ZERO, &profile), BehaviorMode::Lure);
}

#[test]
fn reactive_threat_score_scales_with_multiplier() {
    let profile = BalanceProfile::default();
    let mut bb = board_far_from_territory();
    assert_eq!(bb.reactive_threat_score(&profile), 0.0);

    bb.update_player_info(TargetId(1), Vec3::ZERO, Vec3::new(60.0, 0.0, 0.0), Vec3::FORWARD, true, 0.5, 0.1);
    let expected = (1.0 + 0.5 + 1.0) * profile.reactive_aggression_multiplier;
    assert!((bb.reactive_threat_score(&profile) - expected).abs() < 1e-5);
}

#[test]
fn sanitized_profile_keeps_distances_ordered() {
    let profile = BalanceProfile {
        stalking_min_distance: 0.2,
        stalking_max_distance: 0.1,
        hunting_aggro_distance: 0.0,
        hunting_prediction_lead: -3.0,
        territorial_radius: 0.0,
        lure_cooldown: f32::NAN,
        pack_cohesion_radius: -1.0,
        reactive_aggression_multiplier: 0.0,
    }
    .sanitized();

    assert_eq!(profile.stalking_min_distance, 1.0);
    assert_eq!(profile.stalking_max_distance, 1.5);
    assert_eq!(profile.hunting_aggro_distance, 1.5);
    assert_eq!(profile.hunting_prediction_lead, 0.0);
    assert_eq!(profile.territorial_radius, 1.0);
    assert_eq!(profile.lure_cooldown, 25.0);
    assert_eq!(profile.pack_cohesion_radius, 1.0);
    assert_eq!(profile.reactive_aggression_multiplier, 0.1);
}
