//! In-memory index of known primaries and secondaries.
//!
//! The registry mirrors the store: it is loaded at startup, kept current by
//! the controller and cleared on shutdown. It also carries bookkeeping that is
//! never persisted: expected arrivals, spawn instants and reconciliation marks.

use dynavoice_core::{ChannelId, MemberId, Primary, Secondary};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Registry state for one secondary.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Last known record
    pub secondary: Secondary,
    /// Members the controller moved in whose join event has not arrived yet
    pub expected_arrivals: HashSet<MemberId>,
    /// When this process spawned the secondary; `None` for loaded entries
    pub spawned_at: Option<Instant>,
    /// Store and platform may disagree; reconcile before the next operation
    pub needs_reconcile: bool,
}

impl RegistryEntry {
    fn loaded(secondary: Secondary) -> Self {
        Self {
            secondary,
            expected_arrivals: HashSet::new(),
            spawned_at: None,
            needs_reconcile: true,
        }
    }
}

/// Index of primaries and secondaries.
#[derive(Debug, Default)]
pub struct Registry {
    primaries: RwLock<HashMap<ChannelId, Primary>>,
    secondaries: RwLock<HashMap<ChannelId, RegistryEntry>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with records read from the store.
    ///
    /// Every loaded secondary is marked for reconciliation.
    pub fn load(&self, primaries: Vec<Primary>, secondaries: Vec<Secondary>) {
        let mut p = self.primaries.write();
        let mut s = self.secondaries.write();
        *p = primaries.into_iter().map(|primary| (primary.id, primary)).collect();
        *s = secondaries
            .into_iter()
            .map(|secondary| (secondary.id, RegistryEntry::loaded(secondary)))
            .collect();
        debug!(primaries = p.len(), secondaries = s.len(), "Registry loaded");
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.primaries.write().clear();
        self.secondaries.write().clear();
    }

    /// Look up a primary.
    pub fn primary(&self, id: ChannelId) -> Option<Primary> {
        self.primaries.read().get(&id).cloned()
    }

    /// Insert or replace a primary.
    pub fn upsert_primary(&self, primary: Primary) {
        self.primaries.write().insert(primary.id, primary);
    }

    /// Number of known primaries.
    pub fn primary_count(&self) -> usize {
        self.primaries.read().len()
    }

    /// Look up a secondary.
    pub fn secondary(&self, id: ChannelId) -> Option<Secondary> {
        self.secondaries.read().get(&id).map(|e| e.secondary.clone())
    }

    /// Whether `id` is a known secondary.
    pub fn is_secondary(&self, id: ChannelId) -> bool {
        self.secondaries.read().contains_key(&id)
    }

    /// Snapshot of a secondary's registry entry.
    pub fn entry(&self, id: ChannelId) -> Option<RegistryEntry> {
        self.secondaries.read().get(&id).cloned()
    }

    /// Ids of every known secondary, in id order.
    pub fn secondary_ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<_> = self.secondaries.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Secondaries spawned from `parent`.
    pub fn secondaries_of(&self, parent: ChannelId) -> Vec<Secondary> {
        let mut found: Vec<_> = self
            .secondaries
            .read()
            .values()
            .filter(|e| e.secondary.parent_id == parent)
            .map(|e| e.secondary.clone())
            .collect();
        found.sort_by_key(|s| s.id);
        found
    }

    /// Number of known secondaries.
    pub fn secondary_count(&self) -> usize {
        self.secondaries.read().len()
    }

    /// Record a secondary this process just spawned.
    pub fn insert_spawned(&self, secondary: Secondary, creator_arrival: MemberId) {
        let entry = RegistryEntry {
            expected_arrivals: HashSet::from([creator_arrival]),
            spawned_at: Some(Instant::now()),
            needs_reconcile: false,
            secondary,
        };
        self.secondaries.write().insert(entry.secondary.id, entry);
    }

    /// Insert a secondary known from elsewhere (e.g. re-created during reconciliation).
    pub fn insert(&self, secondary: Secondary) {
        let mut entry = RegistryEntry::loaded(secondary);
        entry.needs_reconcile = false;
        self.secondaries.write().insert(entry.secondary.id, entry);
    }

    /// Remove a secondary.
    pub fn remove(&self, id: ChannelId) -> Option<RegistryEntry> {
        self.secondaries.write().remove(&id)
    }

    /// Replace the stored record of a secondary, keeping its bookkeeping.
    pub fn replace(&self, secondary: Secondary) {
        if let Some(entry) = self.secondaries.write().get_mut(&secondary.id) {
            entry.secondary = secondary;
        }
    }

    /// Most recent secondary of `parent` spawned within `window`.
    pub fn recent_spawn(&self, parent: ChannelId, window: Duration) -> Option<ChannelId> {
        self.secondaries
            .read()
            .values()
            .filter(|e| e.secondary.parent_id == parent)
            .filter_map(|e| e.spawned_at.map(|at| (at, e.secondary.id)))
            .filter(|(at, _)| at.elapsed() < window)
            .max_by_key(|(at, _)| *at)
            .map(|(_, id)| id)
    }

    /// Consume an expected arrival; true if `member` was expected in `id`.
    ///
    /// Arrivals are only expected within `window` of the spawn. Past it the
    /// remaining expectations are dropped.
    pub fn take_expected_arrival(
        &self,
        id: ChannelId,
        member: MemberId,
        window: Duration,
    ) -> bool {
        let mut secondaries = self.secondaries.write();
        let Some(entry) = secondaries.get_mut(&id) else {
            return false;
        };
        let fresh = entry.spawned_at.is_some_and(|at| at.elapsed() < window);
        if !fresh {
            if !entry.expected_arrivals.is_empty() {
                debug!(%id, stale = entry.expected_arrivals.len(), "Dropping stale expected arrivals");
                entry.expected_arrivals.clear();
            }
            return false;
        }
        entry.expected_arrivals.remove(&member)
    }

    /// Mark a secondary for reconciliation.
    pub fn mark_reconcile(&self, id: ChannelId) {
        if let Some(entry) = self.secondaries.write().get_mut(&id) {
            entry.needs_reconcile = true;
        }
    }

    /// Clear the reconciliation mark; true if it was set.
    pub fn take_reconcile(&self, id: ChannelId) -> bool {
        self.secondaries
            .write()
            .get_mut(&id)
            .is_some_and(|e| std::mem::take(&mut e.needs_reconcile))
    }
}
