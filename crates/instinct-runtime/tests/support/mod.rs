#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use instinct_core::{Pose, Species, TargetId, Vec3, WorldView};
use instinct_nav::{MotionActuator, MotionSettings, NavGrid, NavWorld, Navigator, PathFollower};
use instinct_sense::{HitTag, LayerMask, PerceptionWorld, RayHit, TargetState};
use instinct_species::InstinctWorld;

pub struct Creature {
    pub pose: Option<Pose>,
    pub species: Option<Species>,
    pub follower: PathFollower,
}

/// Open 32 x 32 m pen. Creatures may be registered without a pose or species to
/// exercise host inconsistencies.
pub struct PenWorld {
    pub grid: NavGrid,
    pub creatures: BTreeMap<u64, Creature>,
    pub targets: Vec<TargetState>,
    pub killed: BTreeSet<TargetId>,
}

impl Default for PenWorld {
    fn default() -> Self {
        Self {
            grid: NavGrid::new(32, 32, 1.0),
            creatures: BTreeMap::new(),
            targets: Vec::new(),
            killed: BTreeSet::new(),
        }
    }
}

impl PenWorld {
    pub fn spawn(&mut self, id: u64, species: Species, position: Vec3) {
        self.creatures.insert(
            id,
            Creature {
                pose: Some(Pose::new(position, Vec3::FORWARD)),
                species: Some(species),
                follower: PathFollower::new(MotionSettings::default()),
            },
        );
    }

    pub fn add_target(&mut self, id: u64, position: Vec3) {
        self.targets.push(TargetState::new(TargetId(id), position));
    }

    pub fn move_target(&mut self, id: u64, position: Vec3) {
        if let Some(target) = self.targets.iter_mut().find(|t| t.id == TargetId(id)) {
            target.position = position;
        }
    }
}

impl WorldView for PenWorld {
    type Agent = u64;

    fn agents(&self) -> Vec<u64> {
        self.creatures.keys().copied().collect()
    }

    fn pose(&self, agent: u64) -> Option<Pose> {
        self.creatures.get(&agent).and_then(|c| c.pose)
    }

    fn species(&self, agent: u64) -> Option<Species> {
        self.creatures.get(&agent).and_then(|c| c.species)
    }
}

impl NavWorld for PenWorld {
    fn navigator(&self) -> &dyn Navigator {
        &self.grid
    }

    fn actuator(&self, agent: u64) -> Option<&dyn MotionActuator> {
        self.creatures
            .get(&agent)
            .map(|c| &c.follower as &dyn MotionActuator)
    }

    fn actuator_mut(&mut self, agent: u64) -> Option<&mut dyn MotionActuator> {
        self.creatures
            .get_mut(&agent)
            .map(|c| &mut c.follower as &mut dyn MotionActuator)
    }
}

impl PerceptionWorld for PenWorld {
    fn targets(&self) -> Vec<TargetState> {
        self.targets.clone()
    }

    fn is_targetable(&self, _agent: u64, _target: TargetId) -> bool {
        true
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, _mask: LayerMask) -> Option<RayHit> {
        let steps = (max_distance / 0.1).ceil() as usize;
        for i in 1..=steps {
            let distance = (i as f32 * 0.1).min(max_distance);
            let point = origin + direction * distance;
            if !self.grid.is_walkable(point) {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Geometry,
                });
            }
            if let Some(target) = self
                .targets
                .iter()
                .find(|t| (t.position + Vec3::UP * 0.8).distance(point) <= 0.5)
            {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Target(target.id),
                });
            }
        }
        None
    }
}

impl InstinctWorld for PenWorld {
    fn kill_target(&mut self, target: TargetId, _source: Vec3) {
        self.killed.insert(target);
    }
}
