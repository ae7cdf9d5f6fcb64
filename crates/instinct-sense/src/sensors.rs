use std::collections::BTreeMap;

use instinct_core::{AgentId, AllySighting, BalanceProfile, Blackboard, Pose, TargetId, Vec3};
use tracing::warn;

use crate::{HitTag, LayerMask, PerceptionWorld, TargetSnapshot};

/// Height of the eyes above the agent's origin.
pub const EYE_HEIGHT: f32 = 1.0;
/// Height of the torso above a target's origin.
pub const TORSO_HEIGHT: f32 = 0.8;

/// Which stimuli an agent's species consumes.
///
/// Stimuli a species has no interest in are dropped at scan time so they cannot pile
/// up in the snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StimulusInterest {
    /// Footsteps and item drops (heat field events).
    pub heat_events: bool,
    /// Low/high priority noise cues.
    pub noise_cues: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StimulusKind {
    Footstep,
    ItemDrop,
    Noise { low: f32, high: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stimulus {
    pub source: TargetId,
    pub position: Vec3,
    pub kind: StimulusKind,
}

/// Result of one scan, handed to the species module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub target: Option<TargetId>,
    pub visible: bool,
    pub allies: usize,
    pub stimuli: Vec<Stimulus>,
}

/// One agent's perception state.
#[derive(Debug, Clone, Default)]
pub struct Sensors {
    interest: StimulusInterest,
    snapshots: BTreeMap<TargetId, TargetSnapshot>,
}

impl Sensors {
    pub fn new(interest: StimulusInterest) -> Self {
        Self {
            interest,
            snapshots: BTreeMap::new(),
        }
    }

    pub fn interest(&self) -> StimulusInterest {
        self.interest
    }

    pub fn snapshot(&self, target: TargetId) -> Option<&TargetSnapshot> {
        self.snapshots.get(&target)
    }

    pub fn tracked(&self) -> usize {
        self.snapshots.len()
    }

    /// Refresh snapshots, pick the target, write player and pack facts.
    pub fn scan<W>(
        &mut self,
        world: &W,
        agent: W::Agent,
        pose: Pose,
        blackboard: &mut Blackboard,
        profile: &BalanceProfile,
        dt: f32,
    ) -> ScanReport
    where
        W: PerceptionWorld,
    {
        self.refresh_snapshots(world, agent, dt);

        let mut report = ScanReport::default();
        match self.select_target(pose.position, profile.hunt_engage_distance()) {
            Some(snapshot) => {
                let visible = has_line_of_sight(
                    world,
                    pose.position + Vec3::UP * EYE_HEIGHT,
                    snapshot.position + Vec3::UP * TORSO_HEIGHT,
                    snapshot.id,
                );
                blackboard.update_player_info(
                    snapshot.id,
                    pose.position,
                    snapshot.position,
                    snapshot.forward,
                    visible,
                    snapshot.movement_noise(),
                    dt,
                );
                report.target = Some(snapshot.id);
                report.visible = visible;
            }
            None => blackboard.mark_target_lost(dt),
        }

        let allies = collect_allies(world, agent, pose.position, profile.pack_cohesion_radius);
        report.allies = allies.len();
        blackboard.update_allies(allies);

        report.stimuli = self.drain_stimuli();
        report
    }

    fn refresh_snapshots<W>(&mut self, world: &W, agent: W::Agent, dt: f32)
    where
        W: PerceptionWorld,
    {
        let mut seen = Vec::new();
        for state in world.targets() {
            if !state.alive || !world.is_targetable(agent, state.id) {
                continue;
            }
            seen.push(state.id);
            self.snapshots
                .entry(state.id)
                .and_modify(|snapshot| snapshot.update(&state, dt))
                .or_insert_with(|| TargetSnapshot::new(&state));
        }
        self.snapshots.retain(|id, _| seen.contains(id));
    }

    /// Closest snapshot strictly within `max_distance`.
    fn select_target(&self, origin: Vec3, max_distance: f32) -> Option<&TargetSnapshot> {
        let mut best: Option<(&TargetSnapshot, f32)> = None;
        for snapshot in self.snapshots.values() {
            let distance = origin.distance(snapshot.position);
            let limit = best.map_or(max_distance, |(_, d)| d);
            if distance < limit {
                best = Some((snapshot, distance));
            }
        }
        best.map(|(snapshot, _)| snapshot)
    }

    fn drain_stimuli(&mut self) -> Vec<Stimulus> {
        let interest = self.interest;
        let mut stimuli = Vec::new();
        for snapshot in self.snapshots.values_mut() {
            let (footsteps, item_dropped) = snapshot.take_heat_events();
            if interest.heat_events {
                for _ in 0..footsteps {
                    stimuli.push(Stimulus {
                        source: snapshot.id,
                        position: snapshot.position,
                        kind: StimulusKind::Footstep,
                    });
                }
                if item_dropped {
                    stimuli.push(Stimulus {
                        source: snapshot.id,
                        position: snapshot.position,
                        kind: StimulusKind::ItemDrop,
                    });
                }
            }

            if !interest.noise_cues {
                snapshot.discard_noise_cue();
                continue;
            }
            if let Some((low, high)) = snapshot.take_noise_cue() {
                stimuli.push(Stimulus {
                    source: snapshot.id,
                    position: snapshot.position,
                    kind: StimulusKind::Noise { low, high },
                });
            }
        }
        stimuli
    }
}

/// A single ray from `eye` toward `torso` that must hit `target` itself.
pub fn has_line_of_sight<W>(world: &W, eye: Vec3, torso: Vec3, target: TargetId) -> bool
where
    W: PerceptionWorld,
{
    if !eye.is_known() || !torso.is_known() {
        return false;
    }
    let direction = torso - eye;
    let distance = direction.length();
    if distance <= f32::EPSILON {
        return true;
    }
    match world.raycast(eye, direction.normalized(), distance, LayerMask::LINE_OF_SIGHT) {
        Some(hit) => hit.tag == HitTag::Target(target),
        None => false,
    }
}

fn collect_allies<W>(world: &W, agent: W::Agent, origin: Vec3, radius: f32) -> Vec<AllySighting>
where
    W: PerceptionWorld,
{
    let mut allies = Vec::new();
    for other in world.agents() {
        if other == agent {
            continue;
        }
        let Some(pose) = world.pose(other) else {
            warn!(agent = other.stable_id(), "creature without a pose skipped");
            continue;
        };
        if origin.distance(pose.position) <= radius {
            allies.push(AllySighting {
                id: other.stable_id(),
                species: world.species(other).unwrap_or_default(),
                position: pose.position,
                forward: pose.forward,
            });
        }
    }
    allies.sort_by_key(|ally| ally.id);
    allies
}
