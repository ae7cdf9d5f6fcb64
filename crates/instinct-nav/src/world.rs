use instinct_core::WorldView;

use crate::{MotionActuator, Navigator};

pub trait NavWorld: WorldView {
    fn navigator(&self) -> &dyn Navigator;

    fn actuator(&self, agent: Self::Agent) -> Option<&dyn MotionActuator>;

    fn actuator_mut(&mut self, agent: Self::Agent) -> Option<&mut dyn MotionActuator>;
}
