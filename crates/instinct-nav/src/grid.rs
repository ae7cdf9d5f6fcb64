use crate::{NavPath, NavRaycastHit, Navigator};
use core::cmp::Ordering;
use instinct_core::Vec3;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Cell {
    x: i32,
    z: i32,
}

#[derive(Debug)]
struct OpenNode {
    f: u32,
    g: u32,
    cell: Cell,
    tie: u64,
}

impl OpenNode {
    fn key(&self) -> (u32, u32, Cell, u64) {
        (self.f, self.g, self.cell, self.tie)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other.key().cmp(&self.key())
    }
}

/// Flat walkable grid on the XZ plane with its floor at `floor_height`.
///
/// Cell `(x, z)` covers `[x * cell_size, (x + 1) * cell_size)` on both axes. Paths run
/// through cell centers with 4-connectivity; unreachable goals yield a partial path
/// to the explored cell closest to the goal.
#[derive(Debug, Clone)]
pub struct NavGrid {
    width: i32,
    depth: i32,
    cell_size: f32,
    floor_height: f32,
    blocked: Vec<bool>,
}

impl NavGrid {
    pub fn new(width: u32, depth: u32, cell_size: f32) -> Self {
        assert!(width > 0 && depth > 0, "grid must be non-empty");
        assert!(cell_size > 0.0, "cell_size must be > 0");
        let width = width as i32;
        let depth = depth as i32;
        Self {
            width,
            depth,
            cell_size,
            floor_height: 0.0,
            blocked: vec![false; (width * depth) as usize],
        }
    }

    pub fn with_floor_height(mut self, height: f32) -> Self {
        self.floor_height = height;
        self
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space extent on X and Z.
    pub fn extent(&self) -> (f32, f32) {
        (
            self.width as f32 * self.cell_size,
            self.depth as f32 * self.cell_size,
        )
    }

    pub fn set_blocked(&mut self, x: i32, z: i32, blocked: bool) {
        if let Some(idx) = self.idx(Cell { x, z }) {
            self.blocked[idx] = blocked;
        }
    }

    pub fn is_blocked(&self, x: i32, z: i32) -> bool {
        self.idx(Cell { x, z })
            .map(|idx| self.blocked[idx])
            .unwrap_or(true)
    }

    /// Whether `point` lies on a walkable cell.
    pub fn is_walkable(&self, point: Vec3) -> bool {
        self.world_to_cell(point)
            .and_then(|cell| self.idx(cell))
            .is_some_and(|idx| !self.blocked[idx])
    }

    /// Block every cell on the outer border.
    pub fn wall_border(&mut self) {
        for x in 0..self.width {
            self.set_blocked(x, 0, true);
            self.set_blocked(x, self.depth - 1, true);
        }
        for z in 0..self.depth {
            self.set_blocked(0, z, true);
            self.set_blocked(self.width - 1, z, true);
        }
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && cell.x < self.width && cell.z < self.depth
    }

    fn idx(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some((cell.z * self.width + cell.x) as usize)
    }

    fn raw_cell(&self, p: Vec3) -> Cell {
        Cell {
            x: (p.x / self.cell_size).floor() as i32,
            z: (p.z / self.cell_size).floor() as i32,
        }
    }

    fn world_to_cell(&self, p: Vec3) -> Option<Cell> {
        if !p.is_known() {
            return None;
        }
        let cell = self.raw_cell(p);
        if self.in_bounds(cell) {
            Some(cell)
        } else {
            None
        }
    }

    fn cell_center(&self, cell: Cell) -> Vec3 {
        Vec3::new(
            (cell.x as f32 + 0.5) * self.cell_size,
            self.floor_height,
            (cell.z as f32 + 0.5) * self.cell_size,
        )
    }

    fn heuristic(&self, a: Cell, b: Cell) -> u32 {
        ((a.x - b.x).abs() + (a.z - b.z).abs()) as u32
    }

    fn neighbors(&self, cell: Cell) -> [Cell; 4] {
        // Fixed order for determinism: N, E, S, W.
        [
            Cell {
                x: cell.x,
                z: cell.z - 1,
            },
            Cell {
                x: cell.x + 1,
                z: cell.z,
            },
            Cell {
                x: cell.x,
                z: cell.z + 1,
            },
            Cell {
                x: cell.x - 1,
                z: cell.z,
            },
        ]
    }

    fn reconstruct_path(&self, came_from: &[Option<usize>], mut current: usize) -> Vec<usize> {
        let mut out = vec![current];
        while let Some(prev) = came_from[current] {
            current = prev;
            out.push(current);
        }
        out.reverse();
        out
    }

    fn cell_from_idx(&self, idx: usize) -> Cell {
        let idx = idx as i32;
        let x = idx % self.width;
        let z = idx / self.width;
        Cell { x, z }
    }

    /// A* from `start` toward `goal`. The flag is `true` when `goal` was reached;
    /// otherwise the cells lead to the explored cell with the smallest heuristic.
    fn a_star(&self, start: Cell, goal: Cell) -> Option<(Vec<Cell>, bool)> {
        let start_idx = self.idx(start)?;
        if self.blocked[start_idx] {
            return None;
        }
        let goal_idx = self.idx(goal);

        let mut open = BinaryHeap::<OpenNode>::new();
        let mut tie: u64 = 0;

        let grid_len = (self.width * self.depth) as usize;
        let mut g_score = vec![u32::MAX; grid_len];
        let mut came_from: Vec<Option<usize>> = vec![None; grid_len];

        g_score[start_idx] = 0;
        let h0 = self.heuristic(start, goal);
        let mut closest = (h0, 0u32, start_idx);
        open.push(OpenNode {
            f: h0,
            g: 0,
            cell: start,
            tie,
        });
        tie += 1;

        while let Some(node) = open.pop() {
            let node_idx = self.idx(node.cell)?;
            if Some(node_idx) == goal_idx {
                let idx_path = self.reconstruct_path(&came_from, node_idx);
                return Some((
                    idx_path.into_iter().map(|i| self.cell_from_idx(i)).collect(),
                    true,
                ));
            }

            if node.g != g_score[node_idx] {
                // Stale heap entry.
                continue;
            }

            let h = self.heuristic(node.cell, goal);
            if (h, node.g) < (closest.0, closest.1) {
                closest = (h, node.g, node_idx);
            }

            for n in self.neighbors(node.cell) {
                let Some(n_idx) = self.idx(n) else { continue };
                if self.blocked[n_idx] {
                    continue;
                }

                let tentative_g = node.g.saturating_add(1);
                if tentative_g >= g_score[n_idx] {
                    continue;
                }

                came_from[n_idx] = Some(node_idx);
                g_score[n_idx] = tentative_g;
                let h = self.heuristic(n, goal);
                open.push(OpenNode {
                    f: tentative_g.saturating_add(h),
                    g: tentative_g,
                    cell: n,
                    tie,
                });
                tie += 1;
            }
        }

        let idx_path = self.reconstruct_path(&came_from, closest.2);
        Some((
            idx_path.into_iter().map(|i| self.cell_from_idx(i)).collect(),
            false,
        ))
    }
}

impl Navigator for NavGrid {
    fn sample_position(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        if !point.is_known() || !(radius >= 0.0) {
            return None;
        }
        if self.is_walkable(point) {
            return Some(point.with_y(self.floor_height));
        }

        // Ring search over cells whose centers could lie within `radius`.
        let center = self.raw_cell(point);
        let reach = (radius / self.cell_size).ceil() as i32 + 1;
        let mut best: Option<(f32, Cell)> = None;
        for z in (center.z - reach)..=(center.z + reach) {
            for x in (center.x - reach)..=(center.x + reach) {
                let cell = Cell { x, z };
                let Some(idx) = self.idx(cell) else { continue };
                if self.blocked[idx] {
                    continue;
                }
                let distance = self.cell_center(cell).flat().distance(point.flat());
                if distance > radius {
                    continue;
                }
                if best.map_or(true, |(d, c)| (distance, cell) < (d, c)) {
                    best = Some((distance, cell));
                }
            }
        }
        best.map(|(_, cell)| self.cell_center(cell))
    }

    fn find_path(&self, start: Vec3, goal: Vec3) -> Option<NavPath> {
        let start_cell = self.world_to_cell(start)?;
        if !goal.is_known() {
            return None;
        }
        let goal_cell = self.raw_cell(goal);
        let (cells, complete) = self.a_star(start_cell, goal_cell)?;

        let start = start.with_y(self.floor_height);
        let mut points = Vec::with_capacity(cells.len().saturating_add(1));
        points.push(start);

        if complete {
            // Preserve exact endpoints for nicer movement.
            let inner_len = cells.len().saturating_sub(2);
            if cells.len() >= 2 {
                for cell in cells.into_iter().skip(1).take(inner_len) {
                    points.push(self.cell_center(cell));
                }
            }
            points.push(goal.with_y(self.floor_height));
            Some(NavPath::complete(points))
        } else {
            for cell in cells.into_iter().skip(1) {
                points.push(self.cell_center(cell));
            }
            Some(NavPath::partial(points))
        }
    }

    fn raycast(&self, start: Vec3, end: Vec3) -> Option<NavRaycastHit> {
        if !start.is_known() || !end.is_known() {
            return None;
        }
        let start = start.with_y(self.floor_height);
        let end = end.with_y(self.floor_height);
        let delta = end - start;
        let length = delta.length();
        if !self.is_walkable(start) {
            return Some(NavRaycastHit {
                point: start,
                distance: 0.0,
            });
        }
        if length <= f32::EPSILON {
            return None;
        }

        let step = self.cell_size * 0.25;
        let steps = (length / step).ceil() as usize;
        for i in 1..=steps {
            let t = ((i as f32) * step).min(length);
            let point = start + delta * (t / length);
            if !self.is_walkable(point) {
                return Some(NavRaycastHit { point, distance: t });
            }
        }
        None
    }
}
