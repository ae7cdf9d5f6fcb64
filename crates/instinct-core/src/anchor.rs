use std::collections::BTreeMap;

use crate::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct AnchorEntry {
    position: Option<Vec3>,
    last_attempt: f32,
}

/// Lazily resolved named points of interest ("ship", "facility_entrance", ...).
///
/// A found anchor is cached until invalidated. A missing anchor is looked up again
/// only after `retry_seconds` have passed since the previous attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorCache {
    retry_seconds: f32,
    entries: BTreeMap<String, AnchorEntry>,
}

impl Default for AnchorCache {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl AnchorCache {
    pub fn new(retry_seconds: f32) -> Self {
        Self {
            retry_seconds: retry_seconds.max(0.0),
            entries: BTreeMap::new(),
        }
    }

    pub fn retry_seconds(&self) -> f32 {
        self.retry_seconds
    }

    /// Cached position for `name`, consulting `lookup` when the cache allows it.
    pub fn resolve<F>(&mut self, name: &str, now: f32, lookup: F) -> Option<Vec3>
    where
        F: FnOnce(&str) -> Option<Vec3>,
    {
        if let Some(entry) = self.entries.get(name) {
            if entry.position.is_some() {
                return entry.position;
            }
            if now - entry.last_attempt < self.retry_seconds {
                return None;
            }
        }

        let position = lookup(name).filter(|p| p.is_known());
        self.entries.insert(
            name.to_string(),
            AnchorEntry {
                position,
                last_attempt: now,
            },
        );
        position
    }

    pub fn cached(&self, name: &str) -> Option<Vec3> {
        self.entries.get(name).and_then(|entry| entry.position)
    }

    pub fn invalidate(&mut self, name: &str) {
        self.entries.remove(name);
    }
}
