use std::collections::BTreeSet;

use parking_lot::RwLock;

use dupeguard_domain::{normalize_actor_identifier, RawEvent};

/// Actors whose events bypass detection, matched by uuid or name.
#[derive(Debug, Default)]
pub struct ExemptionList {
    entries: RwLock<BTreeSet<String>>,
}

impl ExemptionList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|entry| normalize_actor_identifier(entry.as_ref()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn is_exempt(&self, event: &RawEvent) -> bool {
        let entries = self.entries.read();
        if entries.is_empty() {
            return false;
        }
        [event.actor_uuid.as_deref(), event.actor_name.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(normalize_actor_identifier)
            .any(|identifier| entries.contains(&identifier))
    }

    /// Returns false when the entry is blank or already present.
    pub fn add(&self, entry: &str) -> bool {
        match normalize_actor_identifier(entry) {
            Some(identifier) => self.entries.write().insert(identifier),
            None => false,
        }
    }

    pub fn remove(&self, entry: &str) -> bool {
        match normalize_actor_identifier(entry) {
            Some(identifier) => self.entries.write().remove(&identifier),
            None => false,
        }
    }

    pub fn list(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
