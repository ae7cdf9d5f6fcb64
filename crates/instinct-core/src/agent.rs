use core::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Stable identifier for an agent.
///
/// Deterministic simulation requires:
/// - stable ordering (`Ord`)
/// - a stable numeric ID (`stable_id`) for seeding, per-agent offsets and logs
pub trait AgentId: Copy + Ord + Eq + Debug {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

impl AgentId for usize {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

/// Identity of something a creature can hunt (a player in the host game).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetId(pub u64);

/// Species tag supplied by the host; selects the instinct module and tree factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Species {
    /// Any creature without a dedicated instinct module.
    #[default]
    Generic,
    SandWorm,
    Thumper,
    MouthDog,
    Coilhead,
    Baboon,
    Blob,
    Flowerman,
    Hoarder,
    SandSpider,
}

impl Species {
    pub const ALL: [Species; 10] = [
        Species::Generic,
        Species::SandWorm,
        Species::Thumper,
        Species::MouthDog,
        Species::Coilhead,
        Species::Baboon,
        Species::Blob,
        Species::Flowerman,
        Species::Hoarder,
        Species::SandSpider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Species::Generic => "generic",
            Species::SandWorm => "sand_worm",
            Species::Thumper => "thumper",
            Species::MouthDog => "mouth_dog",
            Species::Coilhead => "coilhead",
            Species::Baboon => "baboon",
            Species::Blob => "blob",
            Species::Flowerman => "flowerman",
            Species::Hoarder => "hoarder",
            Species::SandSpider => "sand_spider",
        }
    }
}

/// Position and facing supplied by the host each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }
}

/// A nearby ally as observed during the last scan.
///
/// Holds the ally's identity and what was seen of it, never the ally itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllySighting {
    pub id: u64,
    pub species: Species,
    pub position: Vec3,
    pub forward: Vec3,
}
