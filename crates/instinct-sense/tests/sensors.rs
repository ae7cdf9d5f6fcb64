use std::collections::{BTreeMap, BTreeSet};

use instinct_core::{BalanceProfile, Blackboard, Pose, Species, TargetId, Territory, Vec3, WorldView};
use instinct_sense::{
    HitTag, LayerMask, PerceptionWorld, RayHit, Sensors, StimulusInterest, StimulusKind,
    TargetSnapshot, TargetState, MAX_FOOTSTEPS_PER_UPDATE,
};

#[derive(Debug, Default)]
struct TestWorld {
    creatures: BTreeMap<u64, Pose>,
    targets: Vec<TargetState>,
    untargetable: BTreeSet<TargetId>,
    /// Rays are blocked by geometry when set.
    occluded: bool,
}

impl TestWorld {
    fn with_creature(mut self, id: u64, position: Vec3) -> Self {
        self.creatures.insert(id, Pose::new(position, Vec3::FORWARD));
        self
    }

    fn with_target(mut self, id: u64, position: Vec3) -> Self {
        self.targets.push(TargetState::new(TargetId(id), position));
        self
    }

    fn target_mut(&mut self, id: u64) -> &mut TargetState {
        self.targets
            .iter_mut()
            .find(|t| t.id == TargetId(id))
            .expect("target exists")
    }
}

impl WorldView for TestWorld {
    type Agent = u64;

    fn agents(&self) -> Vec<u64> {
        self.creatures.keys().copied().collect()
    }

    fn pose(&self, agent: u64) -> Option<Pose> {
        self.creatures.get(&agent).copied()
    }

    fn species(&self, _agent: u64) -> Option<Species> {
        Some(Species::Generic)
    }
}

impl PerceptionWorld for TestWorld {
    fn targets(&self) -> Vec<TargetState> {
        self.targets.clone()
    }

    fn is_targetable(&self, _agent: u64, target: TargetId) -> bool {
        !self.untargetable.contains(&target)
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        assert!(mask.contains(LayerMask::PLAYER));
        if self.occluded {
            return Some(RayHit { point: origin + direction, distance: 1.0, tag: HitTag::Geometry });
        }
        let end = origin + direction * max_distance;
        self.targets
            .iter()
            .find(|t| (t.position + Vec3::UP * 0.8).distance(end) < 0.5)
            .map(|t| RayHit { point: end, distance: max_distance, tag: HitTag::Target(t.id) })
    }
}

fn board() -> Blackboard {
    Blackboard::new(Territory::new(Vec3::new(500.0, 0.0, 500.0), 12.0))
}

fn scan(sensors: &mut Sensors, world: &TestWorld, bb: &mut Blackboard, dt: f32) -> instinct_sense::ScanReport {
    let pose = world.pose(1).expect("agent 1");
    sensors.scan(world, 1, pose, bb, &BalanceProfile::default(), dt)
}

#[test]
fn no_candidates_marks_target_lost() {
    let world = TestWorld::default().with_creature(1, Vec3::ZERO);
    let mut sensors = Sensors::default();
    let mut bb = board();

    let report = scan(&mut sensors, &world, &mut bb, 0.1);
    assert_eq!(report.target, None);
    assert!(!bb.player.visible);
    assert!(bb.player.distance.is_infinite());
}

#[test]
fn closest_target_within_engage_radius_is_selected() {
    // Engage radius with the default profile: 18 * 1.5 = 27.
    let world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(20.0, 0.0, 0.0))
        .with_target(11, Vec3::new(0.0, 0.0, 15.0))
        .with_target(12, Vec3::new(27.0, 0.0, 0.0));
    let mut sensors = Sensors::default();
    let mut bb = board();

    let report = scan(&mut sensors, &world, &mut bb, 0.1);
    assert_eq!(report.target, Some(TargetId(11)));
    assert!(report.visible);
    assert_eq!(bb.player.target, Some(TargetId(11)));
    assert_eq!(bb.player.distance, 15.0);
    assert_eq!(bb.player.time_since_seen.seconds(), 0.0);
    assert_eq!(sensors.tracked(), 3);
}

#[test]
fn target_on_the_engage_boundary_is_ignored() {
    let world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(27.0, 0.0, 0.0));
    let mut sensors = Sensors::default();
    let mut bb = board();
    assert_eq!(scan(&mut sensors, &world, &mut bb, 0.1).target, None);
}

#[test]
fn occluded_target_is_tracked_but_not_visible() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    let mut sensors = Sensors::default();
    let mut bb = board();
    assert!(scan(&mut sensors, &world, &mut bb, 0.5).visible);

    world.occluded = true;
    scan(&mut sensors, &world, &mut bb, 0.5);
    scan(&mut sensors, &world, &mut bb, 0.5);
    assert_eq!(bb.player.target, Some(TargetId(10)));
    assert!(!bb.player.visible);
    assert_eq!(bb.player.distance, 5.0);
    assert!((bb.player.time_since_seen.seconds() - 1.0).abs() < 1e-6);
}

#[test]
fn noise_follows_target_speed() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    let mut sensors = Sensors::default();
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 0.5);
    assert_eq!(bb.player.noise, 0.0);

    world.target_mut(10).position = Vec3::new(6.0, 0.0, 0.0);
    scan(&mut sensors, &world, &mut bb, 0.5);
    // 2 m/s * 0.25
    assert!((bb.player.noise - 0.5).abs() < 1e-5);

    // Zero elapsed time keeps the previous speed instead of dividing by zero.
    scan(&mut sensors, &world, &mut bb, 0.0);
    assert!((bb.player.noise - 0.5).abs() < 1e-5);
}

#[test]
fn untargetable_snapshots_are_pruned() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    let mut sensors = Sensors::default();
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 0.1);
    assert!(sensors.snapshot(TargetId(10)).is_some());

    world.untargetable.insert(TargetId(10));
    let report = scan(&mut sensors, &world, &mut bb, 0.1);
    assert!(sensors.snapshot(TargetId(10)).is_none());
    assert_eq!(report.target, None);
    assert_eq!(bb.player.last_known_position, Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn allies_within_pack_radius_exclude_self() {
    let world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_creature(2, Vec3::new(4.0, 0.0, 0.0))
        .with_creature(3, Vec3::new(0.0, 0.0, 10.0))
        .with_creature(4, Vec3::new(0.0, 0.0, 10.5));
    let mut sensors = Sensors::default();
    let mut bb = board();

    let report = scan(&mut sensors, &world, &mut bb, 0.1);
    assert_eq!(report.allies, 2);
    let ids: Vec<u64> = bb.pack.allies.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(bb.pack.center, Vec3::new(2.0, 0.0, 5.0));
}

#[test]
fn footsteps_follow_stride_and_item_drops_are_reported() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    world.target_mut(10).holding_item = true;
    let mut sensors = Sensors::new(StimulusInterest { heat_events: true, noise_cues: false });
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 0.5);

    // 2.2 m in one tick: two full strides.
    world.target_mut(10).position = Vec3::new(7.2, 0.0, 0.0);
    world.target_mut(10).holding_item = false;
    let report = scan(&mut sensors, &world, &mut bb, 0.5);

    let footsteps = report.stimuli.iter().filter(|s| s.kind == StimulusKind::Footstep).count();
    let drops = report.stimuli.iter().filter(|s| s.kind == StimulusKind::ItemDrop).count();
    assert_eq!(footsteps, 2);
    assert_eq!(drops, 1);
    assert!(report.stimuli.iter().all(|s| s.position == Vec3::new(7.2, 0.0, 0.0)));
    assert!(report.stimuli.iter().all(|s| !matches!(s.kind, StimulusKind::Noise { .. })));
}

#[test]
fn noise_cues_are_discarded_without_interest() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    world.target_mut(10).voice_active = true;

    let mut deaf = Sensors::default();
    let mut listening = Sensors::new(StimulusInterest { heat_events: false, noise_cues: true });
    let mut bb = board();

    scan(&mut deaf, &world, &mut bb, 0.1);
    scan(&mut listening, &world, &mut bb, 0.1);
    world.target_mut(10).voice_active = false;
    assert!(scan(&mut deaf, &world, &mut bb, 0.1).stimuli.is_empty());

    // First scan only creates the snapshot; voice registers from the second one on.
    world.target_mut(10).voice_active = true;
    let report = scan(&mut listening, &world, &mut bb, 0.1);
    assert_eq!(report.stimuli.len(), 1);
    match report.stimuli[0].kind {
        StimulusKind::Noise { low, high } => {
            assert_eq!(low, 0.0);
            assert!((high - 0.65).abs() < 1e-6);
        }
        other => panic!("expected a noise cue, got {other:?}"),
    }
    // Cleared on read.
    world.target_mut(10).voice_active = false;
    assert!(scan(&mut listening, &world, &mut bb, 0.1).stimuli.is_empty());
}

#[test]
fn sprinting_raises_high_cue_and_walking_raises_low_cue() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    let mut sensors = Sensors::new(StimulusInterest { heat_events: false, noise_cues: true });
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 1.0);

    // 2 m/s walk, under one stride per tick: low = 2 / 4.
    world.target_mut(10).position = Vec3::new(5.0, 0.0, 1.0);
    let walk = scan(&mut sensors, &world, &mut bb, 0.5);
    assert_eq!(walk.stimuli.len(), 1);
    assert!(matches!(walk.stimuli[0].kind, StimulusKind::Noise { low, high } if (low - 0.5).abs() < 1e-5 && high == 0.0));

    // 6.5 m/s: high = (6.5 - 3.5) / 3, plus a low cue from the footstep strides.
    world.target_mut(10).position = Vec3::new(5.0, 0.0, 7.5);
    let sprint = scan(&mut sensors, &world, &mut bb, 1.0);
    assert!(matches!(sprint.stimuli[0].kind, StimulusKind::Noise { low, high } if (high - 1.0).abs() < 1e-5 && (low - 0.25).abs() < 1e-5));
}

#[test]
fn inside_facility_resets_pending_stimuli() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(5.0, 0.0, 0.0));
    world.target_mut(10).inside_facility = true;
    world.target_mut(10).holding_item = true;
    let mut sensors = Sensors::new(StimulusInterest { heat_events: true, noise_cues: true });
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 0.5);

    world.target_mut(10).position = Vec3::new(9.0, 0.0, 0.0);
    world.target_mut(10).holding_item = false;
    world.target_mut(10).voice_active = true;
    let report = scan(&mut sensors, &world, &mut bb, 0.5);
    assert!(report.stimuli.is_empty());
}

#[test]
fn long_moves_register_a_bounded_number_of_footsteps() {
    let mut world = TestWorld::default()
        .with_creature(1, Vec3::ZERO)
        .with_target(10, Vec3::new(2.0, 0.0, 0.0));
    let mut sensors = Sensors::new(StimulusInterest { heat_events: true, noise_cues: false });
    let mut bb = board();
    scan(&mut sensors, &world, &mut bb, 0.1);

    world.target_mut(10).position = Vec3::new(2.0, 0.0, 15.0);
    let report = scan(&mut sensors, &world, &mut bb, 0.1);
    let footsteps = report.stimuli.iter().filter(|s| s.kind == StimulusKind::Footstep).count();
    assert_eq!(footsteps, MAX_FOOTSTEPS_PER_UPDATE as usize);
}

#[test]
fn teleported_target_is_silent_and_returns_promptly() {
    let mut state = TargetState::new(TargetId(3), Vec3::ZERO);
    let mut snapshot = TargetSnapshot::new(&state);

    state.position = Vec3::new(1.0e8, 0.0, 0.0);
    snapshot.update(&state, 0.1);
    assert_eq!(snapshot.take_heat_events(), (0, false));
    assert_eq!(snapshot.take_noise_cue(), None);
    assert_eq!(snapshot.speed, 0.0);

    // Walking resumes normally from the new spot.
    state.position = Vec3::new(1.0e8, 0.0, 0.0) + Vec3::new(0.0, 0.0, 1.1);
    snapshot.update(&state, 0.5);
    assert_eq!(snapshot.take_heat_events().0, 1);
}
