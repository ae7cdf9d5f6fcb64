use instinct_bt::BehaviorTree;
use instinct_core::{Blackboard, Commons, Species, TickContext};
use instinct_sense::{ScanReport, StimulusInterest};

use crate::InstinctWorld;

/// One species' instincts: its fact blocks, its tree, and its stimulus handling.
pub trait SpeciesModule<W>
where
    W: InstinctWorld + 'static,
{
    fn species(&self) -> Species;

    /// Stimuli the sensors should hand to [`SpeciesModule::on_scan`].
    fn interest(&self) -> StimulusInterest {
        StimulusInterest::default()
    }

    /// Install this species' fact blocks on a fresh blackboard.
    fn install_facts(&self, _blackboard: &mut Blackboard) {}

    fn build_tree(&self) -> BehaviorTree<W>;

    /// Query the host for anything this species tracks beyond the shared scan. Runs
    /// right after the scan, before [`SpeciesModule::on_scan`].
    fn on_observe(
        &self,
        _world: &W,
        _agent: W::Agent,
        _tick: &TickContext,
        _blackboard: &mut Blackboard,
    ) {
    }

    /// Consume this tick's stimuli. Runs after the scan and before timers advance.
    fn on_scan(
        &self,
        _tick: &TickContext,
        _report: &ScanReport,
        _blackboard: &mut Blackboard,
        _commons: &mut Commons,
    ) {
    }
}
