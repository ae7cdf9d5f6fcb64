use core::ops::BitOr;

use instinct_core::{TargetId, Vec3, WorldView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Host-reported state of one potential target, sampled this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetState {
    pub id: TargetId,
    pub position: Vec3,
    /// Where the target is looking.
    pub forward: Vec3,
    pub alive: bool,
    pub holding_item: bool,
    pub sprinting: bool,
    pub voice_active: bool,
    /// Inside the facility interior, where surface noise does not carry.
    pub inside_facility: bool,
}

impl TargetState {
    pub fn new(id: TargetId, position: Vec3) -> Self {
        Self {
            id,
            position,
            forward: Vec3::FORWARD,
            alive: true,
            holding_item: false,
            sprinting: false,
            voice_active: false,
            inside_facility: false,
        }
    }
}

/// Physics layers a ray may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const DEFAULT: Self = Self(1);
    pub const PLAYER: Self = Self(1 << 1);
    pub const ENVIRONMENT: Self = Self(1 << 2);
    pub const CREATURE: Self = Self(1 << 3);
    /// Traps and turrets creatures path around.
    pub const HAZARD: Self = Self(1 << 4);
    pub const ALL: Self = Self(u32::MAX);

    /// Layers that can block or confirm line of sight.
    pub const LINE_OF_SIGHT: Self = Self(Self::DEFAULT.0 | Self::PLAYER.0 | Self::ENVIRONMENT.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTag {
    Target(TargetId),
    Geometry,
    Hazard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
    pub tag: HitTag,
}

/// Host queries the sensors need.
pub trait PerceptionWorld: WorldView {
    /// Every potential target, engageable or not.
    fn targets(&self) -> Vec<TargetState>;

    /// Whether `agent` may legally engage `target` right now.
    fn is_targetable(&self, agent: Self::Agent, target: TargetId) -> bool;

    /// First hit along `direction` (normalized) within `max_distance`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;
}
