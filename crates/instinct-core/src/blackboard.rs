use crate::{clamp01, AllySighting, BalanceProfile, BlockKey, Elapsed, FactBlock, FactBlocks, TargetId, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the agent currently believes about its selected target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerFacts {
    pub target: Option<TargetId>,
    pub last_known_position: Vec3,
    pub last_known_forward: Vec3,
    pub distance: f32,
    pub visible: bool,
    /// Estimated loudness in `[0, 1]`.
    pub noise: f32,
    pub time_since_seen: Elapsed,
}

impl Default for PlayerFacts {
    fn default() -> Self {
        Self {
            target: None,
            last_known_position: Vec3::UNKNOWN,
            last_known_forward: Vec3::FORWARD,
            distance: f32::INFINITY,
            visible: false,
            noise: 0.0,
            time_since_seen: Elapsed::never(),
        }
    }
}

impl PlayerFacts {
    pub fn has_known_position(&self) -> bool {
        self.last_known_position.is_known()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Territory {
    pub center: Vec3,
    pub radius: f32,
}

impl Territory {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Allies seen during the last scan and their centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct PackFacts {
    pub allies: Vec<AllySighting>,
    /// `Vec3::UNKNOWN` while no ally is nearby.
    pub center: Vec3,
}

impl Default for PackFacts {
    fn default() -> Self {
        Self {
            allies: Vec::new(),
            center: Vec3::UNKNOWN,
        }
    }
}

/// Top-level behavior family, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BehaviorMode {
    Territorial,
    Pack,
    Hunt,
    Lure,
    Stalk,
    Reactive,
}

impl BehaviorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorMode::Territorial => "territorial",
            BehaviorMode::Pack => "pack",
            BehaviorMode::Hunt => "hunt",
            BehaviorMode::Lure => "lure",
            BehaviorMode::Stalk => "stalk",
            BehaviorMode::Reactive => "reactive",
        }
    }
}

/// Per-agent fact store.
///
/// Sensors write the player and pack facts, instinct actions write their own fact
/// blocks, and [`Blackboard::advance_timers`] decays everything once per tick.
#[derive(Debug)]
pub struct Blackboard {
    pub player: PlayerFacts,
    pub pack: PackFacts,
    territory: Territory,
    time_since_lure: Elapsed,
    blocks: FactBlocks,
    last_advanced_tick: Option<u64>,
}

impl Blackboard {
    pub fn new(territory: Territory) -> Self {
        Self {
            player: PlayerFacts::default(),
            pack: PackFacts::default(),
            territory,
            time_since_lure: Elapsed::never(),
            blocks: FactBlocks::new(),
            last_advanced_tick: None,
        }
    }

    pub fn territory(&self) -> Territory {
        self.territory
    }

    /// Move the territory. Only instinct modules that migrate their lair use this.
    pub fn relocate_territory(&mut self, center: Vec3) {
        if center.is_known() {
            self.territory.center = center;
        }
    }

    pub fn set_territory_radius(&mut self, radius: f32) {
        if radius.is_finite() {
            self.territory.radius = radius;
        }
    }

    /// Record a fresh observation of `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_player_info(
        &mut self,
        target: TargetId,
        agent_position: Vec3,
        target_position: Vec3,
        target_forward: Vec3,
        visible: bool,
        noise: f32,
        dt: f32,
    ) {
        let player = &mut self.player;
        player.target = Some(target);
        player.last_known_position = target_position;
        if target_forward.length_squared() > 0.01 {
            player.last_known_forward = target_forward.normalized();
        }
        player.distance = agent_position.distance(target_position);
        player.visible = visible;
        player.noise = clamp01(noise);
        if visible {
            player.time_since_seen.reset();
        } else {
            player.time_since_seen.advance(dt);
        }
    }

    /// No target qualified this tick. The last known position is kept.
    pub fn mark_target_lost(&mut self, dt: f32) {
        let player = &mut self.player;
        player.target = None;
        player.visible = false;
        player.distance = f32::INFINITY;
        player.time_since_seen.advance(dt);
    }

    /// Replace the ally list and recompute the centroid.
    pub fn update_allies(&mut self, allies: Vec<AllySighting>) {
        let known: Vec<AllySighting> = allies
            .into_iter()
            .filter(|ally| ally.position.is_known())
            .collect();
        self.pack.center = if known.is_empty() {
            Vec3::UNKNOWN
        } else {
            let sum = known
                .iter()
                .fold(Vec3::ZERO, |acc, ally| acc + ally.position);
            sum / known.len() as f32
        };
        self.pack.allies = known;
    }

    /// Decay every timer once for `tick`.
    ///
    /// Returns `false` without touching anything when `tick` was already advanced.
    pub fn advance_timers(&mut self, tick: u64, dt: f32) -> bool {
        if self.last_advanced_tick.is_some_and(|last| last >= tick) {
            return false;
        }
        self.last_advanced_tick = Some(tick);
        self.time_since_lure.advance(dt);
        self.blocks.decay_all(dt);
        true
    }

    pub fn time_since_lure(&self) -> f32 {
        self.time_since_lure.seconds()
    }

    pub fn reset_lure_timer(&mut self) {
        self.time_since_lure.reset();
    }

    pub fn blocks(&self) -> &FactBlocks {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut FactBlocks {
        &mut self.blocks
    }

    pub fn install<T: FactBlock>(&mut self, key: BlockKey<T>, block: T) {
        self.blocks.insert(key, block);
    }

    pub fn block<T: FactBlock>(&self, key: BlockKey<T>) -> Option<&T> {
        self.blocks.get(key)
    }

    pub fn block_mut<T: FactBlock>(&mut self, key: BlockKey<T>) -> Option<&mut T> {
        self.blocks.get_mut(key)
    }

    /// Whether the target (or, with no known target, the agent itself) is inside the
    /// territory. Always `false` for a non-positive radius.
    pub fn player_inside_territory(&self, agent_position: Vec3) -> bool {
        let territory = self.territory;
        if !(territory.radius > 0.0) || !territory.center.is_known() {
            return false;
        }
        let mut distance = self.player.last_known_position.distance(territory.center);
        if !distance.is_finite() {
            distance = agent_position.distance(territory.center);
        }
        distance.is_finite() && distance <= territory.radius
    }

    pub fn should_hunt(&self, profile: &BalanceProfile) -> bool {
        self.player.visible && self.player.distance <= profile.hunt_engage_distance()
    }

    pub fn should_stalk(&self, profile: &BalanceProfile) -> bool {
        let distance = self.player.distance;
        self.player.visible
            && distance > profile.stalking_min_distance
            && distance < profile.stalking_max_distance
    }

    pub fn should_swarm(&self) -> bool {
        self.pack.allies.len() >= 2
            && (self.player.visible
                || self.player.noise > 0.4
                || self.player.time_since_seen.seconds() < 4.0)
    }

    pub fn should_lure(&self, profile: &BalanceProfile) -> bool {
        !self.player.visible
            && self.player.time_since_seen.seconds() >= 5.0
            && self.player.noise < 0.25
            && self.time_since_lure.seconds() >= profile.lure_cooldown
    }

    /// Unbounded threat estimate used to scale reactive patrol speed.
    pub fn reactive_threat_score(&self, profile: &BalanceProfile) -> f32 {
        let visibility = if self.player.visible { 1.0 } else { 0.0 };
        let recency = clamp01(10.0 / (self.player.time_since_seen.seconds() + 1.0));
        (visibility + self.player.noise + recency) * profile.reactive_aggression_multiplier
    }

    /// The highest-priority mode whose predicate currently holds.
    pub fn mode(&self, agent_position: Vec3, profile: &BalanceProfile) -> BehaviorMode {
        if self.player_inside_territory(agent_position) {
            BehaviorMode::Territorial
        } else if self.should_swarm() {
            BehaviorMode::Pack
        } else if self.should_hunt(profile) {
            BehaviorMode::Hunt
        } else if self.should_lure(profile) {
            BehaviorMode::Lure
        } else if self.should_stalk(profile) {
            BehaviorMode::Stalk
        } else {
            BehaviorMode::Reactive
        }
    }
}
