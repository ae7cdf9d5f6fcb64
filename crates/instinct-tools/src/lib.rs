//! Tooling primitives for observing creature decisions.
//!
//! Engine-agnostic and allocation-light: the coordinator records what each agent
//! decided, and tests or tooling read it back without installing a tracing subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    tags, NullTraceSink, SharedTraceSink, TraceEvent, TraceLog, TraceSink, VecTraceSink,
};
