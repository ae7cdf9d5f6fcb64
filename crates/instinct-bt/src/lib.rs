//! Stateless behavior tree runtime built on `instinct-core`.
//!
//! Nodes are immutable once built; every bit of cross-tick continuation lives in the
//! agent's [`instinct_core::Blackboard`], so one tree instance can be evaluated for
//! any number of agents.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod context;
pub mod nodes;
pub mod tree;

pub use bt::{BtNode, BtStatus};
pub use context::EvalContext;
pub use nodes::{
    action, condition, observing_condition, selector, sequence, Action, Condition,
    ObservingCondition, PrioritySelector, Sequence,
};
pub use tree::BehaviorTree;
