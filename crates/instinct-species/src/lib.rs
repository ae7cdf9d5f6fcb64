//! Instinct modules.
//!
//! Each species contributes a handful of conditions and actions, the fact blocks they
//! keep on the blackboard, and a factory assembling them into a priority selector of
//! sequences. Every tree ends with the [`steer::idle`] leaf, so a correctly assembled
//! tree never reports `Failure` from its root.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod baboon;
pub mod blob;
pub mod coilhead;
pub mod flowerman;
pub mod generic;
pub mod hoarder;
pub mod module;
pub mod mouth_dog;
pub mod registry;
pub mod sand_spider;
pub mod sand_worm;
pub mod steer;
pub mod thumper;
pub mod world;

pub use baboon::{BaboonFacts, BaboonModule, BABOON_CAMP_ANCHOR, BABOON_FACTS};
pub use blob::{BlobFacts, BlobModule, BLOB_FACTS};
pub use coilhead::{CoilheadFacts, CoilheadModule, COILHEAD_FACTS};
pub use flowerman::{FlowermanFacts, FlowermanModule, FLOWERMAN_FACTS};
pub use generic::GenericModule;
pub use hoarder::{AggroLevel, HoarderFacts, HoarderModule, HOARDER_FACTS};
pub use module::SpeciesModule;
pub use mouth_dog::{MouthDogFacts, MouthDogModule, MOUTH_DOG_FACTS};
pub use registry::SpeciesRegistry;
pub use sand_spider::{ChokePoint, SandSpiderFacts, SandSpiderModule, SAND_SPIDER_FACTS};
pub use sand_worm::{AttackStage, SandWormFacts, SandWormModule, SAND_WORM_FACTS, STRIKE_HEAT_THRESHOLD};
pub use thumper::{ChargeState, ThumperFacts, ThumperModule, THUMPER_FACTS};
pub use world::{
    AnimationSignal, CameraShake, DoorAccess, DoorId, DoorSighting, ExitSighting, InstinctWorld,
    LootId, LootSighting, WebId, WebSighting,
};
