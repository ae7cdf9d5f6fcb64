//! Perception sensors.
//!
//! Once per tick a [`Sensors`] instance turns raw host queries into blackboard facts:
//! the nearest engageable target, its visibility and loudness, nearby allies, and the
//! footstep/noise stimuli that species modules consume.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod sensors;
pub mod snapshot;
pub mod world;

pub use sensors::{
    has_line_of_sight, ScanReport, Sensors, Stimulus, StimulusInterest, StimulusKind, EYE_HEIGHT,
    TORSO_HEIGHT,
};
pub use snapshot::{
    TargetSnapshot, FOOTSTEP_STRIDE, MAX_FOOTSTEPS_PER_UPDATE, TELEPORT_DISTANCE,
};
pub use world::{HitTag, LayerMask, PerceptionWorld, RayHit, TargetState};
