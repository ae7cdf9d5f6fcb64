use std::collections::BTreeMap;

use instinct_core::{Pose, Species, TargetId, Vec3, WorldView};
use instinct_nav::{MotionActuator, MotionSettings, NavGrid, NavWorld, Navigator, PathFollower};
use instinct_sense::{HitTag, LayerMask, PerceptionWorld, RayHit, TargetState, TORSO_HEIGHT};
use instinct_species::{
    AnimationSignal, CameraShake, DoorAccess, DoorId, DoorSighting, ExitSighting, InstinctWorld,
    LootId, LootSighting, WebId, WebSighting,
};

/// Distance inside which a target can notice a creature looking at it.
pub const OBSERVE_RANGE: f32 = 25.0;
/// Cosine of the half-angle of a target's view cone.
pub const OBSERVE_CONE_COS: f32 = 0.82;
/// Radius of a target's torso for ray hits.
const TARGET_RADIUS: f32 = 0.5;
const RAY_STEP: f32 = 0.1;
/// Speed above which a scripted target counts as sprinting.
const SPRINT_SPEED: f32 = 4.25;
/// A living target this close to a web is stuck in it.
const WEB_CATCH_RADIUS: f32 = 0.75;
/// Radius of a hazard for ray hits.
const HAZARD_RADIUS: f32 = 0.5;

pub struct Creature {
    pub pose: Pose,
    pub species: Species,
    pub follower: PathFollower,
}

/// A target walking a fixed loop of waypoints.
#[derive(Debug, Clone)]
pub struct ScriptedTarget {
    pub state: TargetState,
    pub waypoints: Vec<Vec3>,
    pub speed: f32,
    next: usize,
    /// Simulation time at which a carried item is dropped.
    drop_at: Option<f32>,
}

impl ScriptedTarget {
    pub fn new(id: TargetId, start: Vec3, waypoints: Vec<Vec3>, speed: f32) -> Self {
        Self {
            state: TargetState::new(id, start),
            waypoints,
            speed: speed.max(0.0),
            next: 0,
            drop_at: None,
        }
    }

    /// Carry an item until `time`, then drop it.
    pub fn carrying_until(mut self, time: f32) -> Self {
        self.state.holding_item = true;
        self.drop_at = Some(time);
        self
    }

    fn advance(&mut self, dt: f32, time: f32) {
        if !self.state.alive {
            self.state.sprinting = false;
            return;
        }
        if self.drop_at.is_some_and(|at| time >= at) {
            self.state.holding_item = false;
            self.drop_at = None;
        }
        let Some(&waypoint) = self.waypoints.get(self.next) else {
            self.state.sprinting = false;
            return;
        };

        let to_waypoint = (waypoint - self.state.position).flat();
        let distance = to_waypoint.length();
        let stride = self.speed * dt;
        if distance <= stride {
            self.state.position = waypoint.with_y(self.state.position.y);
            self.next = (self.next + 1) % self.waypoints.len();
        } else {
            let direction = to_waypoint.normalized();
            self.state.position = self.state.position + direction * stride;
            self.state.forward = direction;
        }
        self.state.sprinting = self.speed > SPRINT_SPEED;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaDoor {
    pub position: Vec3,
    pub open: bool,
    /// How often a creature forced it open.
    pub forced: u32,
}

impl DoorAccess for ArenaDoor {
    fn is_open(&self) -> bool {
        self.open
    }

    fn force_open(&mut self) {
        self.forced += 1;
        self.open = true;
    }
}

/// A web standing in the arena and the creature that spun it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaWeb {
    pub owner: u32,
    pub position: Vec3,
}

/// Walled grid arena with creatures, scripted targets, doors and anchors.
///
/// Doors do not block the grid; creatures that respect them stop on their own.
/// Hazards only show up on rays cast with [`LayerMask::HAZARD`].
pub struct ArenaWorld {
    pub grid: NavGrid,
    pub creatures: BTreeMap<u32, Creature>,
    pub targets: Vec<ScriptedTarget>,
    pub doors: BTreeMap<DoorId, ArenaDoor>,
    pub anchors: BTreeMap<String, Vec3>,
    pub loot: BTreeMap<LootId, Vec3>,
    pub carried: BTreeMap<u32, LootId>,
    pub exits: Vec<ExitSighting>,
    pub hazards: Vec<Vec3>,
    pub webs: BTreeMap<WebId, ArenaWeb>,
    pub authoritative: bool,
    pub kills: Vec<TargetId>,
    pub shakes: Vec<CameraShake>,
    pub signals: Vec<(u32, AnimationSignal)>,
    pub time: f32,
    next_creature: u32,
    next_web: WebId,
}

impl ArenaWorld {
    pub fn new(width: u32, depth: u32, cell_size: f32) -> Self {
        let mut grid = NavGrid::new(width, depth, cell_size);
        grid.wall_border();
        Self {
            grid,
            creatures: BTreeMap::new(),
            targets: Vec::new(),
            doors: BTreeMap::new(),
            anchors: BTreeMap::new(),
            loot: BTreeMap::new(),
            carried: BTreeMap::new(),
            exits: Vec::new(),
            hazards: Vec::new(),
            webs: BTreeMap::new(),
            authoritative: true,
            kills: Vec::new(),
            shakes: Vec::new(),
            signals: Vec::new(),
            time: 0.0,
            next_creature: 1,
            next_web: 1,
        }
    }

    pub fn spawn(&mut self, species: Species, position: Vec3) -> u32 {
        let id = self.next_creature;
        self.next_creature += 1;
        self.creatures.insert(
            id,
            Creature {
                pose: Pose::new(position, Vec3::FORWARD),
                species,
                follower: PathFollower::new(MotionSettings::default()),
            },
        );
        id
    }

    /// Remove a creature. Whatever it carried stays where it stood.
    pub fn despawn(&mut self, id: u32) -> bool {
        self.carried.remove(&id);
        self.creatures.remove(&id).is_some()
    }

    pub fn add_target(&mut self, target: ScriptedTarget) {
        self.targets.retain(|t| t.state.id != target.state.id);
        self.targets.push(target);
    }

    pub fn add_door(&mut self, id: DoorId, position: Vec3, open: bool) {
        self.doors.insert(
            id,
            ArenaDoor {
                position,
                open,
                forced: 0,
            },
        );
    }

    pub fn set_anchor(&mut self, name: impl Into<String>, position: Vec3) {
        self.anchors.insert(name.into(), position);
    }

    pub fn add_loot(&mut self, id: LootId, position: Vec3) {
        self.loot.insert(id, position);
    }

    /// Add an exit; the first one added is the main entrance.
    pub fn add_exit(&mut self, position: Vec3, forward: Vec3) {
        self.exits.push(ExitSighting { position, forward });
    }

    pub fn add_hazard(&mut self, position: Vec3) {
        self.hazards.push(position);
    }

    pub fn tear_web(&mut self, id: WebId) -> bool {
        self.webs.remove(&id).is_some()
    }

    pub fn target(&self, id: TargetId) -> Option<&TargetState> {
        self.targets
            .iter()
            .map(|t| &t.state)
            .find(|state| state.id == id)
    }

    pub fn creature(&self, id: u32) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// Move every creature along its committed path and every target along its script.
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for creature in self.creatures.values_mut() {
            let next = creature.follower.advance(creature.pose.position, dt);
            let heading = (next - creature.pose.position).flat();
            if heading.length_squared() > 1e-6 {
                creature.pose.forward = heading.normalized();
            }
            creature.pose.position = next;
        }
        for (agent, loot) in &self.carried {
            if let (Some(creature), Some(item)) = (self.creatures.get(agent), self.loot.get_mut(loot)) {
                *item = creature.pose.position;
            }
        }
        self.time += dt;
        for target in &mut self.targets {
            target.advance(dt, self.time);
        }
    }

    fn line_is_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.grid.raycast(from, to).is_none()
    }
}

impl WorldView for ArenaWorld {
    type Agent = u32;

    fn agents(&self) -> Vec<u32> {
        self.creatures.keys().copied().collect()
    }

    fn pose(&self, agent: u32) -> Option<Pose> {
        self.creatures.get(&agent).map(|c| c.pose)
    }

    fn species(&self, agent: u32) -> Option<Species> {
        self.creatures.get(&agent).map(|c| c.species)
    }
}

impl NavWorld for ArenaWorld {
    fn navigator(&self) -> &dyn Navigator {
        &self.grid
    }

    fn actuator(&self, agent: u32) -> Option<&dyn MotionActuator> {
        self.creatures
            .get(&agent)
            .map(|c| &c.follower as &dyn MotionActuator)
    }

    fn actuator_mut(&mut self, agent: u32) -> Option<&mut dyn MotionActuator> {
        self.creatures
            .get_mut(&agent)
            .map(|c| &mut c.follower as &mut dyn MotionActuator)
    }
}

impl PerceptionWorld for ArenaWorld {
    fn targets(&self) -> Vec<TargetState> {
        self.targets.iter().map(|t| t.state).collect()
    }

    fn is_targetable(&self, _agent: u32, target: TargetId) -> bool {
        self.target(target)
            .is_some_and(|state| state.alive && !state.inside_facility)
    }

    /// Marches the ray across the grid. Blocked cells are geometry; targets are spheres
    /// around their torso.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        if !origin.is_known() || !direction.is_known() || !(max_distance > 0.0) {
            return None;
        }
        let hits_geometry =
            mask.contains(LayerMask::DEFAULT) || mask.contains(LayerMask::ENVIRONMENT);
        let hits_targets = mask.contains(LayerMask::PLAYER);
        let hits_hazards = mask.contains(LayerMask::HAZARD);
        let steps = (max_distance / RAY_STEP).ceil() as usize;
        for i in 1..=steps {
            let distance = (i as f32 * RAY_STEP).min(max_distance);
            let point = origin + direction * distance;
            if hits_hazards
                && self
                    .hazards
                    .iter()
                    .any(|hazard| hazard.flat().distance(point.flat()) <= HAZARD_RADIUS)
            {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Hazard,
                });
            }
            if hits_geometry && !self.grid.is_walkable(point) {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Geometry,
                });
            }
            if hits_targets {
                let hit = self.targets.iter().find(|t| {
                    t.state.alive
                        && (t.state.position + Vec3::UP * TORSO_HEIGHT).distance(point)
                            <= TARGET_RADIUS
                });
                if let Some(target) = hit {
                    return Some(RayHit {
                        point,
                        distance,
                        tag: HitTag::Target(target.state.id),
                    });
                }
            }
        }
        None
    }
}

impl InstinctWorld for ArenaWorld {
    fn is_authoritative(&self, _agent: u32) -> bool {
        self.authoritative
    }

    fn kill_target(&mut self, target: TargetId, _source: Vec3) {
        if let Some(scripted) = self.targets.iter_mut().find(|t| t.state.id == target) {
            if !scripted.state.alive {
                return;
            }
            scripted.state.alive = false;
        }
        self.kills.push(target);
    }

    fn shake_camera(&mut self, shake: CameraShake) {
        self.shakes.push(shake);
    }

    /// A living target within range has the creature inside its view cone with nothing
    /// blocking the line between them.
    fn is_observed(&self, agent: u32) -> bool {
        let Some(creature) = self.creatures.get(&agent) else {
            return false;
        };
        let position = creature.pose.position;
        self.targets.iter().map(|t| &t.state).any(|state| {
            if !state.alive || state.inside_facility {
                return false;
            }
            let to_creature = (position - state.position).flat();
            let distance = to_creature.length();
            if distance > OBSERVE_RANGE {
                return false;
            }
            if distance <= f32::EPSILON {
                return true;
            }
            let facing = state.forward.flat().normalized();
            facing.dot(to_creature / distance) >= OBSERVE_CONE_COS
                && self.line_is_clear(state.position, position)
        })
    }

    fn signal(&mut self, agent: u32, signal: AnimationSignal) {
        self.signals.push((agent, signal));
    }

    fn face(&mut self, agent: u32, direction: Vec3) {
        let flat = direction.flat();
        if flat.length_squared() <= 1e-6 {
            return;
        }
        if let Some(creature) = self.creatures.get_mut(&agent) {
            creature.pose.forward = flat.normalized();
        }
    }

    fn doors(&self) -> Vec<DoorSighting> {
        self.doors
            .iter()
            .map(|(&id, door)| DoorSighting {
                id,
                position: door.position,
            })
            .collect()
    }

    fn door(&self, id: DoorId) -> Option<&dyn DoorAccess> {
        self.doors.get(&id).map(|door| door as &dyn DoorAccess)
    }

    fn door_mut(&mut self, id: DoorId) -> Option<&mut dyn DoorAccess> {
        self.doors
            .get_mut(&id)
            .map(|door| door as &mut dyn DoorAccess)
    }

    fn anchor(&self, name: &str) -> Option<Vec3> {
        self.anchors.get(name).copied()
    }

    fn loot_near(&self, origin: Vec3, radius: f32) -> Option<LootSighting> {
        self.loot
            .iter()
            .filter(|(id, _)| !self.carried.values().any(|held| held == *id))
            .map(|(&id, &position)| (origin.distance(position), LootSighting { id, position }))
            .filter(|(distance, _)| *distance <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, sighting)| sighting)
    }

    fn carried_loot(&self, agent: u32) -> Option<LootId> {
        self.carried.get(&agent).copied()
    }

    fn pick_up_loot(&mut self, agent: u32, loot: LootId) -> bool {
        let held = self.carried.values().any(|id| *id == loot);
        if held || !self.loot.contains_key(&loot) || self.carried.contains_key(&agent) {
            return false;
        }
        self.carried.insert(agent, loot);
        true
    }

    fn drop_loot(&mut self, agent: u32) -> Option<LootId> {
        let loot = self.carried.remove(&agent)?;
        if let (Some(item), Some(creature)) = (self.loot.get_mut(&loot), self.creatures.get(&agent)) {
            *item = creature.pose.position;
        }
        Some(loot)
    }

    fn exits(&self) -> Vec<ExitSighting> {
        self.exits.clone()
    }

    /// A web is occupied while a living target stands in it.
    fn webs(&self, agent: u32) -> Vec<WebSighting> {
        self.webs
            .iter()
            .filter(|(_, web)| web.owner == agent)
            .map(|(&id, web)| WebSighting {
                id,
                position: web.position,
                occupied: self.targets.iter().any(|t| {
                    t.state.alive && t.state.position.flat().distance(web.position.flat()) <= WEB_CATCH_RADIUS
                }),
            })
            .collect()
    }

    fn spin_web(&mut self, agent: u32, position: Vec3) -> Option<WebId> {
        if !self.creatures.contains_key(&agent) || !self.grid.is_walkable(position) {
            return None;
        }
        let id = self.next_web;
        self.next_web += 1;
        self.webs.insert(id, ArenaWeb { owner: agent, position });
        Some(id)
    }
}
