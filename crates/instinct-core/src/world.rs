use crate::{AgentId, Pose, Species};

/// Read-only host access shared by every subsystem.
///
/// The core crate only asks for identity, pose and species; navigation, perception
/// and species capabilities are extension traits in their own crates.
pub trait WorldView {
    type Agent: AgentId;

    /// Every live creature, in any order.
    fn agents(&self) -> Vec<Self::Agent>;

    fn pose(&self, agent: Self::Agent) -> Option<Pose>;

    fn species(&self, agent: Self::Agent) -> Option<Species>;
}
