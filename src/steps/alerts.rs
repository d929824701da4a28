//! One-shot alert bookkeeping
//!
//! Each alert is armed at step start and fires at most once per run, no
//! matter how many polling cycles observe its condition.

use std::collections::BTreeMap;

/// Identifies an alert within a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertId {
    FirstWort,
    Lid,
    /// Hop addition, numbered from 1
    Hop(u8),
}

/// Alert id → fired?
#[derive(Debug, Clone, Default)]
pub struct AlertTable {
    alerts: BTreeMap<AlertId, bool>,
}

impl AlertTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alert as pending (clears a previous firing)
    pub fn arm(&mut self, id: AlertId) {
        self.alerts.insert(id, false);
    }

    /// Mark an armed alert as fired
    ///
    /// Returns `true` only the first time for an armed alert.
    pub fn fire(&mut self, id: AlertId) -> bool {
        match self.alerts.get_mut(&id) {
            Some(fired) if !*fired => {
                *fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, id: AlertId) -> bool {
        self.alerts.contains_key(&id)
    }

    pub fn has_fired(&self, id: AlertId) -> bool {
        self.alerts.get(&id).copied().unwrap_or(false)
    }

    /// Armed alerts that have not fired yet
    pub fn pending(&self) -> Vec<AlertId> {
        self.alerts
            .iter()
            .filter(|(_, fired)| !**fired)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}
