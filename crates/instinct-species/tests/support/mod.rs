#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use instinct_bt::{BehaviorTree, BtStatus, EvalContext};
use instinct_core::{
    BalanceProfile, Blackboard, Commons, Pose, Species, TargetId, Territory, TickContext, Vec3,
    WorldView,
};
use instinct_nav::{MotionActuator, MotionSettings, NavGrid, NavWorld, Navigator, PathFollower};
use instinct_sense::{HitTag, LayerMask, PerceptionWorld, RayHit, TargetState};
use instinct_species::{
    AnimationSignal, CameraShake, DoorAccess, DoorId, DoorSighting, ExitSighting, InstinctWorld,
    LootId, LootSighting, SpeciesModule, WebId, WebSighting,
};

pub struct Creature {
    pub pose: Pose,
    pub species: Species,
    pub follower: PathFollower,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestDoor {
    pub position: Vec3,
    pub open: bool,
    pub forced: u32,
}

impl DoorAccess for TestDoor {
    fn is_open(&self) -> bool {
        self.open
    }

    fn force_open(&mut self) {
        self.forced += 1;
        self.open = true;
    }
}

/// Open 40 x 40 m grid with one-meter cells.
pub struct TestWorld {
    pub grid: NavGrid,
    pub creatures: BTreeMap<u32, Creature>,
    pub targets: Vec<TargetState>,
    pub untargetable: BTreeSet<TargetId>,
    pub observed: bool,
    pub authoritative: bool,
    pub killed: Vec<TargetId>,
    pub shakes: Vec<CameraShake>,
    pub signals: Vec<(u32, AnimationSignal)>,
    pub facing: Vec<(u32, Vec3)>,
    pub doors: BTreeMap<DoorId, TestDoor>,
    pub anchors: BTreeMap<String, Vec3>,
    pub loot: BTreeMap<LootId, Vec3>,
    pub carried: BTreeMap<u32, LootId>,
    pub exits: Vec<ExitSighting>,
    /// Trap positions; rays on the hazard layer stop within half a meter of one.
    pub hazards: Vec<Vec3>,
    pub webs: BTreeMap<WebId, TestWeb>,
    pub next_web: WebId,
    pub refuse_webs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestWeb {
    pub position: Vec3,
    pub occupied: bool,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            grid: NavGrid::new(40, 40, 1.0),
            creatures: BTreeMap::new(),
            targets: Vec::new(),
            untargetable: BTreeSet::new(),
            observed: false,
            authoritative: true,
            killed: Vec::new(),
            shakes: Vec::new(),
            signals: Vec::new(),
            facing: Vec::new(),
            doors: BTreeMap::new(),
            anchors: BTreeMap::new(),
            loot: BTreeMap::new(),
            carried: BTreeMap::new(),
            exits: Vec::new(),
            hazards: Vec::new(),
            webs: BTreeMap::new(),
            next_web: 1,
            refuse_webs: false,
        }
    }
}

impl TestWorld {
    pub fn spawn(&mut self, id: u32, species: Species, position: Vec3) {
        self.creatures.insert(
            id,
            Creature {
                pose: Pose::new(position, Vec3::FORWARD),
                species,
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

    pub fn add_web(&mut self, position: Vec3) -> WebId {
        let id = self.next_web;
        self.next_web += 1;
        self.webs.insert(
            id,
            TestWeb {
                position,
                occupied: false,
            },
        );
        id
    }

    pub fn follower(&self, id: u32) -> &PathFollower {
        &self.creatures[&id].follower
    }

    /// Walk every creature along its committed path.
    pub fn advance(&mut self, dt: f32) {
        for creature in self.creatures.values_mut() {
            let next = creature.follower.advance(creature.pose.position, dt);
            let heading = (next - creature.pose.position).flat();
            if heading.length_squared() > 1e-6 {
                creature.pose.forward = heading.normalized();
            }
            creature.pose.position = next;
        }
    }
}

impl WorldView for TestWorld {
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

impl NavWorld for TestWorld {
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

impl PerceptionWorld for TestWorld {
    fn targets(&self) -> Vec<TargetState> {
        self.targets.clone()
    }

    fn is_targetable(&self, _agent: u32, target: TargetId) -> bool {
        !self.untargetable.contains(&target)
    }

    /// Marches the ray in 5 cm steps; blocked cells are geometry.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let steps = (max_distance / 0.05).ceil() as usize;
        for i in 1..=steps {
            let distance = (i as f32 * 0.05).min(max_distance);
            let point = origin + direction * distance;
            if mask.contains(LayerMask::HAZARD)
                && self
                    .hazards
                    .iter()
                    .any(|hazard| hazard.flat().distance(point.flat()) <= 0.5)
            {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Hazard,
                });
            }
            if !self.grid.is_walkable(point) {
                return Some(RayHit {
                    point,
                    distance,
                    tag: HitTag::Geometry,
                });
            }
            for target in &self.targets {
                if (target.position + Vec3::UP * 0.8).distance(point) <= 0.5 {
                    return Some(RayHit {
                        point,
                        distance,
                        tag: HitTag::Target(target.id),
                    });
                }
            }
        }
        None
    }
}

impl InstinctWorld for TestWorld {
    fn is_authoritative(&self, _agent: u32) -> bool {
        self.authoritative
    }

    fn kill_target(&mut self, target: TargetId, _source: Vec3) {
        if let Some(state) = self.targets.iter_mut().find(|t| t.id == target) {
            state.alive = false;
        }
        self.killed.push(target);
    }

    fn shake_camera(&mut self, shake: CameraShake) {
        self.shakes.push(shake);
    }

    fn is_observed(&self, _agent: u32) -> bool {
        self.observed
    }

    fn signal(&mut self, agent: u32, signal: AnimationSignal) {
        self.signals.push((agent, signal));
    }

    fn face(&mut self, agent: u32, direction: Vec3) {
        self.facing.push((agent, direction));
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
        self.doors.get(&id).map(|d| d as &dyn DoorAccess)
    }

    fn door_mut(&mut self, id: DoorId) -> Option<&mut dyn DoorAccess> {
        self.doors.get_mut(&id).map(|d| d as &mut dyn DoorAccess)
    }

    fn anchor(&self, name: &str) -> Option<Vec3> {
        self.anchors.get(name).copied()
    }

    fn loot_near(&self, origin: Vec3, radius: f32) -> Option<LootSighting> {
        let held: BTreeSet<LootId> = self.carried.values().copied().collect();
        self.loot
            .iter()
            .filter(|(id, _)| !held.contains(id))
            .map(|(&id, &position)| (origin.distance(position), LootSighting { id, position }))
            .filter(|(distance, _)| *distance <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, sighting)| sighting)
    }

    fn carried_loot(&self, agent: u32) -> Option<LootId> {
        self.carried.get(&agent).copied()
    }

    fn pick_up_loot(&mut self, agent: u32, loot: LootId) -> bool {
        if !self.loot.contains_key(&loot) || self.carried.contains_key(&agent) {
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

    fn webs(&self, _agent: u32) -> Vec<WebSighting> {
        self.webs
            .iter()
            .map(|(&id, web)| WebSighting {
                id,
                position: web.position,
                occupied: web.occupied,
            })
            .collect()
    }

    fn spin_web(&mut self, agent: u32, position: Vec3) -> Option<WebId> {
        if self.refuse_webs || !self.creatures.contains_key(&agent) {
            return None;
        }
        Some(self.add_web(position))
    }
}

/// One creature's tree plus everything it needs between ticks.
pub struct Harness {
    pub world: TestWorld,
    pub blackboard: Blackboard,
    pub commons: Commons,
    pub profile: BalanceProfile,
    pub tree: BehaviorTree<TestWorld>,
    pub agent: u32,
    pub tick: TickContext,
    pub last_action: Option<&'static str>,
}

impl Harness {
    pub fn new(module: &dyn SpeciesModule<TestWorld>, position: Vec3) -> Self {
        let mut world = TestWorld::default();
        world.spawn(1, module.species(), position);
        let mut blackboard = Blackboard::new(Territory::new(position, 12.0));
        module.install_facts(&mut blackboard);
        Self {
            world,
            blackboard,
            commons: Commons::default(),
            profile: BalanceProfile::default(),
            tree: module.build_tree(),
            agent: 1,
            tick: TickContext::new(0, 0.1, 0.0, 7),
            last_action: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.world.creatures[&self.agent].pose.position
    }

    /// Run the species' host queries for the current tick.
    pub fn observe(&mut self, module: &dyn SpeciesModule<TestWorld>) {
        module.on_observe(&self.world, self.agent, &self.tick, &mut self.blackboard);
    }

    pub fn teleport(&mut self, position: Vec3) {
        if let Some(creature) = self.world.creatures.get_mut(&self.agent) {
            creature.pose.position = position;
        }
    }

    /// Advance timers for the current tick and evaluate the tree once. Does not move
    /// the creature.
    pub fn evaluate(&mut self) -> BtStatus {
        let tick = self.tick;
        self.blackboard.advance_timers(tick.tick, tick.dt());
        self.commons.advance(tick.tick, tick.dt());

        let pose = self.world.creatures[&self.agent].pose;
        let species = self.world.creatures[&self.agent].species;
        let mut ctx = EvalContext::new(
            tick,
            self.agent,
            pose,
            species,
            &mut self.world,
            &mut self.blackboard,
            &mut self.commons,
            &self.profile,
        );
        let status = self.tree.tick(&mut ctx);
        self.last_action = ctx.active_action();
        drop(ctx);
        status
    }

    /// Evaluate, move, and step the clock.
    pub fn step(&mut self) -> BtStatus {
        let status = self.evaluate();
        self.world.advance(self.tick.dt());
        self.tick = self.tick.next(self.tick.dt());
        status
    }

    /// Step the clock without evaluating or moving.
    pub fn idle_step(&mut self) {
        self.tick = self.tick.next(self.tick.dt());
    }

    pub fn see_player(&mut self, position: Vec3) {
        let own = self.position();
        let player = &mut self.blackboard.player;
        player.target = Some(TargetId(1));
        player.last_known_position = position;
        player.distance = own.distance(position);
        player.visible = true;
        player.time_since_seen.reset();
    }
}
