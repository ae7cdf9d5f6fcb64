use std::collections::BTreeMap;

use instinct_core::{Species, TargetId, Vec3};
use instinct_runtime::{Coordinator, RuntimeConfig, StepSummary};
use instinct_tools::{SharedTraceSink, TraceLog};
use tracing::info;

use crate::{ArenaWorld, ScriptedTarget};

/// Totals from [`Simulation::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimReport {
    pub ticks: u64,
    pub root_failures: usize,
    pub skipped: usize,
    pub kills: Vec<TargetId>,
    /// How often each action label was entered.
    pub actions: BTreeMap<String, usize>,
}

/// An arena driven by a coordinator, with every decision recorded.
pub struct Simulation {
    pub world: ArenaWorld,
    pub coordinator: Coordinator<ArenaWorld>,
    trace: SharedTraceSink,
}

impl Simulation {
    pub fn new(world: ArenaWorld, config: &RuntimeConfig) -> Self {
        let trace = SharedTraceSink::new();
        let coordinator = Coordinator::from_config(config).with_trace_sink(trace.clone());
        Self {
            world,
            coordinator,
            trace,
        }
    }

    /// 48 x 48 m walled arena: one creature per species, two scripted targets, a closed
    /// door in the middle and a ship anchor in a corner. Scattered loot, two exits and a
    /// hazard give the scavengers and ambushers something to work with.
    pub fn standard(config: &RuntimeConfig) -> Self {
        let mut world = ArenaWorld::new(48, 48, 1.0);
        for z in 8..20 {
            world.grid.set_blocked(24, z, true);
        }

        world.spawn(Species::Generic, Vec3::new(10.5, 0.0, 10.5));
        world.spawn(Species::SandWorm, Vec3::new(36.5, 0.0, 36.5));
        world.spawn(Species::Thumper, Vec3::new(10.5, 0.0, 36.5));
        world.spawn(Species::MouthDog, Vec3::new(36.5, 0.0, 10.5));
        world.spawn(Species::Coilhead, Vec3::new(24.5, 0.0, 32.5));
        world.spawn(Species::Baboon, Vec3::new(14.5, 0.0, 24.5));
        world.spawn(Species::Blob, Vec3::new(32.5, 0.0, 14.5));
        world.spawn(Species::Flowerman, Vec3::new(40.5, 0.0, 24.5));
        world.spawn(Species::Hoarder, Vec3::new(18.5, 0.0, 40.5));
        world.spawn(Species::SandSpider, Vec3::new(32.5, 0.0, 40.5));

        let perimeter = vec![
            Vec3::new(40.5, 0.0, 6.5),
            Vec3::new(40.5, 0.0, 40.5),
            Vec3::new(6.5, 0.0, 40.5),
            Vec3::new(6.5, 0.0, 6.5),
        ];
        world.add_target(
            ScriptedTarget::new(TargetId(1), Vec3::new(6.5, 0.0, 6.5), perimeter, 3.0)
                .carrying_until(12.0),
        );
        let inner = vec![
            Vec3::new(30.5, 0.0, 20.5),
            Vec3::new(30.5, 0.0, 30.5),
            Vec3::new(18.5, 0.0, 30.5),
            Vec3::new(18.5, 0.0, 20.5),
        ];
        world.add_target(ScriptedTarget::new(
            TargetId(2),
            Vec3::new(18.5, 0.0, 20.5),
            inner,
            5.5,
        ));

        world.add_door(1, Vec3::new(24.5, 0.0, 26.5), false);
        world.set_anchor("ship", Vec3::new(4.5, 0.0, 43.5));
        world.set_anchor("baboon_camp", Vec3::new(14.5, 0.0, 24.5));
        world.add_exit(Vec3::new(24.5, 0.0, 45.5), Vec3::FORWARD);
        world.add_exit(Vec3::new(45.5, 0.0, 24.5), Vec3::new(1.0, 0.0, 0.0));
        world.add_hazard(Vec3::new(32.5, 0.0, 18.5));
        world.add_loot(1, Vec3::new(16.5, 0.0, 28.5));
        world.add_loot(2, Vec3::new(26.5, 0.0, 38.5));
        world.add_loot(3, Vec3::new(38.5, 0.0, 30.5));
        Self::new(world, config)
    }

    /// Evaluate every creature once, then let the world move.
    pub fn step(&mut self, dt: f32) -> StepSummary {
        let summary = self.coordinator.step(&mut self.world, dt);
        self.world.advance(dt);
        summary
    }

    pub fn run(&mut self, ticks: u64, dt: f32) -> SimReport {
        let mut report = SimReport::default();
        for _ in 0..ticks {
            let summary = self.step(dt);
            report.ticks += 1;
            report.root_failures += summary.failed;
            report.skipped += summary.skipped;
        }
        report.kills = self.world.kills.clone();
        report.actions = self.trace.snapshot().action_histogram();
        info!(
            ticks = report.ticks,
            kills = report.kills.len(),
            root_failures = report.root_failures,
            "simulation finished"
        );
        report
    }

    pub fn trace(&self) -> TraceLog {
        self.trace.snapshot()
    }
}
