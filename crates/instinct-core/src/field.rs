use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{clamp01, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeatFieldConfig {
    /// Edge length of one square cell on the XZ plane, in meters.
    pub cell_size: f32,
    pub max_heat: f32,
    /// Heat lost per second by every cell.
    pub decay_per_second: f32,
    /// Cells at or below this value are removed.
    pub prune_floor: f32,
}

impl Default for HeatFieldConfig {
    fn default() -> Self {
        Self {
            cell_size: 6.0,
            max_heat: 40.0,
            decay_per_second: 1.2,
            prune_floor: 0.01,
        }
    }
}

impl HeatFieldConfig {
    pub const FOOTSTEP_HEAT: f32 = 1.0;
    pub const ITEM_DROP_HEAT: f32 = 5.0;
    pub const MIN_BURST_HEAT: f32 = 0.5;
    pub const DAMPEN_FACTOR: f32 = 0.2;
}

/// The hottest surviving cell of a [`HeatField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatCell {
    pub cell: (i32, i32),
    pub center: Vec3,
    pub heat: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    heat: f32,
    height: f32,
}

/// Sparse grid of decaying noise intensity.
///
/// World events add heat to the cell containing them; every cell loses heat linearly
/// over time and is dropped once it reaches the prune floor.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatField {
    config: HeatFieldConfig,
    cells: BTreeMap<(i32, i32), Cell>,
    last_decay_tick: Option<u64>,
}

impl Default for HeatField {
    fn default() -> Self {
        Self::new(HeatFieldConfig::default())
    }
}

impl HeatField {
    pub fn new(config: HeatFieldConfig) -> Self {
        let config = HeatFieldConfig {
            cell_size: if config.cell_size > 0.0 { config.cell_size } else { 6.0 },
            max_heat: config.max_heat.max(0.0),
            decay_per_second: config.decay_per_second.max(0.0),
            prune_floor: config.prune_floor.max(0.0),
        };
        Self {
            config,
            cells: BTreeMap::new(),
            last_decay_tick: None,
        }
    }

    pub fn config(&self) -> &HeatFieldConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn cell_of(&self, position: Vec3) -> (i32, i32) {
        let size = self.config.cell_size;
        (
            (position.x / size).floor() as i32,
            (position.z / size).floor() as i32,
        )
    }

    fn cell_center(&self, cell: (i32, i32), height: f32) -> Vec3 {
        let size = self.config.cell_size;
        Vec3::new(
            (cell.0 as f32 + 0.5) * size,
            height,
            (cell.1 as f32 + 0.5) * size,
        )
    }

    pub fn register_footstep(&mut self, position: Vec3) {
        self.add_heat(position, HeatFieldConfig::FOOTSTEP_HEAT);
    }

    pub fn register_item_drop(&mut self, position: Vec3) {
        self.add_heat(position, HeatFieldConfig::ITEM_DROP_HEAT);
    }

    /// An explicit burst (roars, explosions). Never adds less than the minimum burst.
    pub fn register_burst(&mut self, position: Vec3, magnitude: f32) {
        if !magnitude.is_finite() {
            return;
        }
        self.add_heat(position, magnitude.max(HeatFieldConfig::MIN_BURST_HEAT));
    }

    /// Add `amount` to the cell at `position`, clamped to `[0, max_heat]`.
    /// Non-finite positions or amounts are ignored.
    pub fn add_heat(&mut self, position: Vec3, amount: f32) {
        if !position.is_known() || !amount.is_finite() {
            return;
        }
        let key = self.cell_of(position);
        let max_heat = self.config.max_heat;
        let cell = self.cells.entry(key).or_insert(Cell {
            heat: 0.0,
            height: position.y,
        });
        cell.heat = (cell.heat + amount).clamp(0.0, max_heat);
        cell.height = position.y;
        if cell.heat <= self.config.prune_floor {
            self.cells.remove(&key);
        }
    }

    /// Linear decay of every cell; cells at or below the floor are pruned.
    pub fn decay(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        let loss = self.config.decay_per_second * dt;
        let floor = self.config.prune_floor;
        self.cells.retain(|_, cell| {
            cell.heat = (cell.heat - loss).max(0.0);
            cell.heat > floor
        });
    }

    /// Decay once for `tick`; later calls for the same tick are ignored.
    pub fn advance(&mut self, tick: u64, dt: f32) -> bool {
        if self.last_decay_tick.is_some_and(|last| last >= tick) {
            return false;
        }
        self.last_decay_tick = Some(tick);
        self.decay(dt);
        true
    }

    pub fn heat_at(&self, position: Vec3) -> f32 {
        if !position.is_known() {
            return 0.0;
        }
        self.cells
            .get(&self.cell_of(position))
            .map_or(0.0, |cell| cell.heat)
    }

    /// The hottest cell with strictly positive heat. Ties keep the lowest cell index.
    pub fn hottest(&self) -> Option<HeatCell> {
        let mut best: Option<HeatCell> = None;
        for (&key, cell) in &self.cells {
            if cell.heat <= 0.0 {
                continue;
            }
            if best.map_or(true, |b| cell.heat > b.heat) {
                best = Some(HeatCell {
                    cell: key,
                    center: self.cell_center(key, cell.height),
                    heat: cell.heat,
                });
            }
        }
        best
    }

    /// Heat as a fraction of the field's maximum.
    pub fn normalize(&self, heat: f32) -> f32 {
        if self.config.max_heat <= 0.0 {
            return 0.0;
        }
        clamp01(heat / self.config.max_heat)
    }

    /// Scale down every cell whose center lies within `radius` of `position`.
    pub fn dampen(&mut self, position: Vec3, radius: f32) {
        if !position.is_known() || !(radius > 0.0) {
            return;
        }
        let size = self.config.cell_size;
        let floor = self.config.prune_floor;
        self.cells.retain(|&key, cell| {
            let center = Vec3::new(
                (key.0 as f32 + 0.5) * size,
                position.y,
                (key.1 as f32 + 0.5) * size,
            );
            if center.distance(position) <= radius {
                cell.heat *= HeatFieldConfig::DAMPEN_FACTOR;
            }
            cell.heat > floor
        });
    }

    /// Seconds of decay until the cell at `position` holds strictly less than
    /// `threshold`. Zero when it already does.
    pub fn seconds_until_below(&self, position: Vec3, threshold: f32) -> f32 {
        let heat = self.heat_at(position);
        if heat < threshold {
            return 0.0;
        }
        if self.config.decay_per_second <= 0.0 {
            return f32::INFINITY;
        }
        (heat - threshold) / self.config.decay_per_second
    }
}
