//! Tracks which parts of a record changed locally since its last successful
//! save.
//!
//! Every local mutation bumps a generation counter and stamps the touched key
//! with it. A save snapshots the generation it was built from, and on success
//! only forgets changes stamped at or before that generation. Anything touched
//! while the save was in flight stays dirty for the next one.

use ::std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct DirtyTracker {
    /// Bumped on every local mutation
    generation: u64,
    /// key -> generation of the last local change to that key
    changed: BTreeMap<String, u64>,
    /// generation of the last local ACL change, if any is pending
    acl_changed: Option<u64>,
}

impl DirtyTracker {
    pub fn new() -> DirtyTracker {
        Default::default()
    }

    /// The generation of the most recent mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark a field key as changed
    pub fn touch(&mut self, key: &str) {
        self.generation += 1;
        self.changed.insert(String::from(key), self.generation);
    }

    /// Mark the ACL as changed
    pub fn touch_acl(&mut self) {
        self.generation += 1;
        self.acl_changed = Some(self.generation);
    }

    /// Whether there are local changes we haven't saved
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || self.acl_changed.is_some()
    }

    pub fn is_changed(&self, key: &str) -> bool {
        self.changed.contains_key(key)
    }

    pub fn changed_keys(&self) -> Vec<String> {
        self.changed.keys().cloned().collect()
    }

    /// A save built from generation `upto` made it to the server. Forget every
    /// change that save carried.
    pub fn commit(&mut self, upto: u64) {
        self.changed.retain(|_, gen| *gen > upto);
        if self.acl_changed.map(|gen| gen <= upto).unwrap_or(false) {
            self.acl_changed = None;
        }
    }

    /// Forget everything. Used when the server's copy replaces ours wholesale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.changed.clear();
        self.acl_changed = None;
    }
}
