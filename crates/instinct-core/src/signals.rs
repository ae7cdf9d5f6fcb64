use std::collections::BTreeMap;

use crate::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PackOrder {
    attack_target: Vec3,
    attack_until: f32,
    move_direction: Vec3,
    move_until: f32,
}

impl Default for PackOrder {
    fn default() -> Self {
        Self {
            attack_target: Vec3::UNKNOWN,
            attack_until: f32::NEG_INFINITY,
            move_direction: Vec3::ZERO,
            move_until: f32::NEG_INFINITY,
        }
    }
}

impl PackOrder {
    fn expires_at(&self) -> f32 {
        self.attack_until.max(self.move_until)
    }
}

/// Orders a pack leader posts for the rest of its pack.
///
/// Packs are keyed by their leader's stable id. Orders carry an absolute expiry on
/// the simulation clock, so the board needs no per-tick decay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackSignals {
    orders: BTreeMap<u64, PackOrder>,
}

impl PackSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `pack` to converge on `target` until `now + hold`.
    pub fn post_attack(&mut self, pack: u64, target: Vec3, now: f32, hold: f32) {
        if !target.is_known() || !(hold > 0.0) {
            return;
        }
        self.prune(now);
        let order = self.orders.entry(pack).or_default();
        order.attack_target = target;
        order.attack_until = now + hold;
    }

    /// Ask `pack` to drift along `direction` (flattened) until `now + hold`.
    pub fn post_move(&mut self, pack: u64, direction: Vec3, now: f32, hold: f32) {
        let direction = direction.flat().normalized();
        if direction.length_squared() <= 0.0 || !(hold > 0.0) {
            return;
        }
        self.prune(now);
        let order = self.orders.entry(pack).or_default();
        order.move_direction = direction;
        order.move_until = now + hold;
    }

    pub fn attack_target(&self, pack: u64, now: f32) -> Option<Vec3> {
        self.orders
            .get(&pack)
            .filter(|order| now < order.attack_until)
            .map(|order| order.attack_target)
    }

    pub fn move_direction(&self, pack: u64, now: f32) -> Option<Vec3> {
        self.orders
            .get(&pack)
            .filter(|order| now < order.move_until)
            .map(|order| order.move_direction)
    }

    /// Withdraw the attack order, keeping any move order.
    pub fn stand_down(&mut self, pack: u64) {
        if let Some(order) = self.orders.get_mut(&pack) {
            order.attack_target = Vec3::UNKNOWN;
            order.attack_until = f32::NEG_INFINITY;
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn prune(&mut self, now: f32) {
        self.orders.retain(|_, order| now < order.expires_at());
    }
}
