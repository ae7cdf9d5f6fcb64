//! Runtime layer: the [`Coordinator`] that owns every agent's perception, memory and
//! tree, plus the YAML configuration it is built from.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{BalanceConfig, RuntimeConfig};
pub use coordinator::{Coordinator, StepSummary};
pub use error::CoordinatorError;
