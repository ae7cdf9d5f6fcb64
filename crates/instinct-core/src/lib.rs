//! Deterministic, engine-agnostic kernel primitives for creature instincts.
//!
//! Everything an agent remembers between ticks lives in its [`Blackboard`]; everything
//! shared between agents of one simulation lives in [`Commons`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod anchor;
pub mod blackboard;
pub mod commons;
pub mod facts;
pub mod field;
pub mod math;
pub mod profile;
pub mod rng;
pub mod signals;
pub mod tick;
pub mod timer;
pub mod world;

pub use agent::{AgentId, AllySighting, Pose, Species, TargetId};
pub use anchor::AnchorCache;
pub use blackboard::{BehaviorMode, Blackboard, PackFacts, PlayerFacts, Territory};
pub use commons::Commons;
pub use facts::{BlockKey, FactBlock, FactBlocks};
pub use field::{HeatCell, HeatField, HeatFieldConfig};
pub use math::{clamp01, inverse_lerp, lerp, Vec3};
pub use profile::BalanceProfile;
pub use rng::{DeterministicRng, SplitMix64};
pub use signals::PackSignals;
pub use tick::TickContext;
pub use timer::{Elapsed, LatchTimer};
pub use world::WorldView;
