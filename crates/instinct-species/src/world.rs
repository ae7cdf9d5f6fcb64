use instinct_core::{TargetId, Vec3};
use instinct_nav::NavWorld;
use instinct_sense::PerceptionWorld;

pub type DoorId = u64;
pub type LootId = u64;
pub type WebId = u64;

/// Narrow view of a door the host lets creatures manipulate.
pub trait DoorAccess {
    fn is_open(&self) -> bool;

    fn force_open(&mut self);
}

/// A door and where it sits, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorSighting {
    pub id: DoorId,
    pub position: Vec3,
}

/// A loose item a creature could carry off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootSighting {
    pub id: LootId,
    pub position: Vec3,
}

/// A facility exit and the direction its doorway faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSighting {
    pub position: Vec3,
    pub forward: Vec3,
}

/// A web a creature spun, and whether a target is stuck in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebSighting {
    pub id: WebId,
    pub position: Vec3,
    pub occupied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraShake {
    Big,
    VeryStrong,
}

/// One-shot animation cues sent to the host's replicated creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationSignal {
    Stop,
    Go,
}

/// Everything an instinct module may ask of the host.
///
/// Only navigation and perception are required. The remaining capabilities default to
/// "not available", and modules degrade to their fallback branches without them.
pub trait InstinctWorld: NavWorld + PerceptionWorld {
    /// Whether this evaluator owns lethal outcomes for `agent`.
    fn is_authoritative(&self, _agent: Self::Agent) -> bool {
        true
    }

    fn kill_target(&mut self, target: TargetId, source: Vec3);

    fn shake_camera(&mut self, _shake: CameraShake) {}

    /// Whether any engageable target is looking at `agent` right now.
    fn is_observed(&self, _agent: Self::Agent) -> bool {
        false
    }

    fn signal(&mut self, _agent: Self::Agent, _signal: AnimationSignal) {}

    /// Turn `agent` to face along `direction` (flattened).
    fn face(&mut self, _agent: Self::Agent, _direction: Vec3) {}

    fn doors(&self) -> Vec<DoorSighting> {
        Vec::new()
    }

    fn door(&self, _id: DoorId) -> Option<&dyn DoorAccess> {
        None
    }

    fn door_mut(&mut self, _id: DoorId) -> Option<&mut dyn DoorAccess> {
        None
    }

    /// Position of a named point of interest such as `"ship"`.
    fn anchor(&self, _name: &str) -> Option<Vec3> {
        None
    }

    /// Nearest loose item within `radius` of `origin`.
    fn loot_near(&self, _origin: Vec3, _radius: f32) -> Option<LootSighting> {
        None
    }

    fn carried_loot(&self, _agent: Self::Agent) -> Option<LootId> {
        None
    }

    fn pick_up_loot(&mut self, _agent: Self::Agent, _loot: LootId) -> bool {
        false
    }

    /// Put down whatever `agent` carries where it stands.
    fn drop_loot(&mut self, _agent: Self::Agent) -> Option<LootId> {
        None
    }

    /// Facility exits, main entrance first.
    fn exits(&self) -> Vec<ExitSighting> {
        Vec::new()
    }

    /// Webs `agent` spun that are still standing.
    fn webs(&self, _agent: Self::Agent) -> Vec<WebSighting> {
        Vec::new()
    }

    fn spin_web(&mut self, _agent: Self::Agent, _position: Vec3) -> Option<WebId> {
        None
    }
}
