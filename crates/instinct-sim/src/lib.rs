//! Headless host for creature instincts.
//!
//! [`ArenaWorld`] implements every host capability over a walled [`NavGrid`]
//! (`instinct_nav::NavGrid`), and [`Simulation`] drives it with a
//! [`Coordinator`](instinct_runtime::Coordinator).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod arena;
pub mod simulation;

pub use arena::{ArenaDoor, ArenaWorld, Creature, ScriptedTarget};
pub use simulation::{SimReport, Simulation};
