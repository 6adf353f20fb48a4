//! Current rule set holder
//!
//! Replacement swaps the whole rule set at once. Snapshots are `Arc`s, so a
//! classification running on an old snapshot never sees a half-applied update.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::RuleSet;

struct Versioned {
    rules: Arc<RuleSet>,
    version: u64,
}

pub struct RuleStore {
    current: RwLock<Versioned>,
}

impl RuleStore {
    /// Starts at version 1
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Versioned {
                rules: Arc::new(rules),
                version: 1,
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.read().rules.clone()
    }

    /// Rule set together with the version it was installed as
    pub fn snapshot_versioned(&self) -> (Arc<RuleSet>, u64) {
        let current = self.current.read();
        (current.rules.clone(), current.version)
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Install a new rule set, returning its version
    pub fn replace(&self, rules: RuleSet) -> u64 {
        let mut current = self.current.write();
        current.rules = Arc::new(rules);
        current.version += 1;
        current.version
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_bumps_version() {
        let store = RuleStore::default();
        assert_eq!(store.version(), 1);
        assert_eq!(store.replace(RuleSet::empty()), 2);
        assert_eq!(store.replace(RuleSet::default()), 3);
        assert_eq!(store.snapshot_versioned().1, 3);
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = RuleStore::default();
        let before = store.snapshot();

        store.replace(RuleSet::empty());

        assert_eq!(*before, RuleSet::default());
        assert!(store.snapshot().is_empty());
    }
}
