//! Navigation primitives: backend queries, motion actuators and goal synthesis.
//!
//! The synthesizer turns "go roughly there" into a validated path committed to the
//! agent's actuator, or a typed [`NavFailure`] that callers treat as "stay put".

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod actuator;
pub mod follower;
pub mod grid;
pub mod navigator;
pub mod synth;
pub mod world;

pub use actuator::{MotionActuator, MotionSettings};
pub use follower::PathFollower;
pub use grid::NavGrid;
pub use navigator::{NavPath, NavRaycastHit, Navigator, PathStatus};
pub use synth::{
    agent_offset, estimate_path_length, try_move_agent, MoveRequest, NavCommit, NavFailure,
    MIN_SAMPLE_RADIUS, SAMPLE_RADIUS_MULTIPLIERS,
};
pub use world::NavWorld;
