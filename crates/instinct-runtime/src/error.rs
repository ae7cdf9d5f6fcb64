use thiserror::Error;

/// Why the coordinator refused an agent.
///
/// Only integration problems surface here. An agent that merely cannot act this tick
/// idles inside its tree and never produces an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("agent {0} is not known to the host")]
    UnknownAgent(u64),
    #[error("agent {0} is already attached")]
    AlreadyAttached(u64),
    #[error("agent {0} has no pose")]
    MissingPose(u64),
}

impl CoordinatorError {
    pub fn agent(&self) -> u64 {
        match *self {
            CoordinatorError::UnknownAgent(id)
            | CoordinatorError::AlreadyAttached(id)
            | CoordinatorError::MissingPose(id) => id,
        }
    }
}
