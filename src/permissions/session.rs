use std::collections::HashSet;

use crate::concurrency::lock_state;
use crate::types::Fingerprint;

#[derive(Debug, Default)]
struct Decisions {
    allowed: HashSet<Fingerprint>,
    denied: HashSet<Fingerprint>,
}

/// Prompt answers remembered for the lifetime of one agent session.
#[derive(Debug, Default)]
pub struct SessionDecisions {
    inner: std::sync::Mutex<Decisions>,
}

impl SessionDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: Fingerprint) -> Option<bool> {
        let decisions = lock_state(&self.inner);
        if decisions.denied.contains(&key) {
            Some(false)
        } else if decisions.allowed.contains(&key) {
            Some(true)
        } else {
            None
        }
    }

    pub fn record(&self, key: Fingerprint, allowed: bool) {
        let mut decisions = lock_state(&self.inner);
        if allowed {
            decisions.denied.remove(&key);
            decisions.allowed.insert(key);
        } else {
            decisions.allowed.remove(&key);
            decisions.denied.insert(key);
        }
    }

    pub fn clear(&self) {
        let mut decisions = lock_state(&self.inner);
        decisions.allowed.clear();
        decisions.denied.clear();
    }

    pub fn len(&self) -> usize {
        let decisions = lock_state(&self.inner);
        decisions.allowed.len() + decisions.denied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
