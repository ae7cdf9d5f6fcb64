use instinct_core::{Species, WorldView};
use tracing::trace;

use crate::bt::{BtNode, BtStatus};
use crate::EvalContext;

/// A built tree: the root node plus the species it was built for.
pub struct BehaviorTree<W>
where
    W: WorldView + 'static,
{
    species: Species,
    root: Box<dyn BtNode<W>>,
}

impl<W> BehaviorTree<W>
where
    W: WorldView + 'static,
{
    pub fn new(species: Species, root: Box<dyn BtNode<W>>) -> Self {
        Self { species, root }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn root(&self) -> &dyn BtNode<W> {
        self.root.as_ref()
    }

    /// Evaluate from the root, depth first.
    pub fn tick(&self, ctx: &mut EvalContext<'_, W>) -> BtStatus {
        let status = self.root.tick(ctx);
        trace!(
            tick = ctx.tick.tick,
            agent = ctx.stable_id(),
            species = self.species.as_str(),
            status = status.as_str(),
            action = ctx.active_action().unwrap_or("-"),
            "tree evaluated"
        );
        status
    }
}
