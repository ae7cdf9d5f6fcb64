use instinct_core::WorldView;

use crate::EvalContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtStatus {
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn from_bool(value: bool) -> Self {
        if value {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BtStatus::Running => "running",
            BtStatus::Success => "success",
            BtStatus::Failure => "failure",
        }
    }
}

/// A structural tree node.
///
/// `tick` takes `&self`: nodes never hold per-agent state, so "running" continuation
/// is expressed through blackboard facts the node reads on the next tick.
pub trait BtNode<W>: 'static
where
    W: WorldView + 'static,
{
    fn name(&self) -> &str;

    fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus;
}
