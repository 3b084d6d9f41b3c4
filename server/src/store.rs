//! Permanent and temporary tag partitions
//!
//! This module owns every tag assignment known to the server:
//! - Permanent tags, written to the persistence provider on every change
//! - Temporary tags, held only until the round ends
//!
//! Mutations of the permanent partition hand back a [`PendingSave`]: a
//! snapshot the caller writes out once it has released whatever lock guards
//! the store.
//!
//! Lookups prefer the permanent partition. A player can end up in both
//! partitions at once; the temporary entry is then shadowed until the
//! permanent one is removed.

use crate::error::{Result, TagError};
use crate::persistence::{TagMap, TagPersistence};
use log::{error, info};
use shared::TagAssignment;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Snapshot of the permanent partition waiting to be written out.
#[must_use = "permanent changes are only durable once the pending save is written"]
pub struct PendingSave {
    tags: TagMap,
    persistence: Arc<dyn TagPersistence>,
}

impl PendingSave {
    /// Number of permanent tags in the snapshot
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Writes the snapshot through the persistence provider. Blocking.
    pub fn write(self) -> Result<()> {
        match self.persistence.save(&self.tags) {
            Ok(()) => {
                info!("Saved tag data for {} players", self.tags.len());
                Ok(())
            }
            Err(e) => {
                error!("Failed to save tag data: {}", e);
                Err(TagError::Persist(e.to_string()))
            }
        }
    }
}

pub struct TagStore {
    /// Tags that survive restarts, keyed by user id
    permanent: TagMap,
    /// Tags cleared at round end, keyed by user id
    temporary: TagMap,
    persistence: Arc<dyn TagPersistence>,
}

impl TagStore {
    /// Creates an empty store backed by `persistence`. Call [`TagStore::load`]
    /// to pull in previously saved tags.
    pub fn new(persistence: Box<dyn TagPersistence>) -> Self {
        Self {
            permanent: TagMap::new(),
            temporary: TagMap::new(),
            persistence: Arc::from(persistence),
        }
    }

    /// Replaces the permanent partition with the persisted one.
    ///
    /// On failure the permanent partition is left empty and the error is
    /// returned for the caller to report; the store stays usable.
    pub fn load(&mut self) -> Result<usize> {
        match self.persistence.load() {
            Ok(tags) => {
                self.permanent = tags;
                info!("Loaded tag data for {} players", self.permanent.len());
                Ok(self.permanent.len())
            }
            Err(e) => {
                self.permanent = TagMap::new();
                Err(e)
            }
        }
    }

    /// Snapshots the permanent partition for a later write.
    pub fn pending_save(&self) -> PendingSave {
        PendingSave {
            tags: self.permanent.clone(),
            persistence: Arc::clone(&self.persistence),
        }
    }

    /// Looks up the assignment the engine should use for `user_id`.
    pub fn get(&self, user_id: &str) -> Option<&TagAssignment> {
        self.permanent
            .get(user_id)
            .or_else(|| self.temporary.get(user_id))
    }

    pub fn get_mut(&mut self, user_id: &str) -> Option<&mut TagAssignment> {
        if self.permanent.contains_key(user_id) {
            return self.permanent.get_mut(user_id);
        }
        self.temporary.get_mut(user_id)
    }

    /// Inserts or replaces a permanent tag. The insert stands whether or
    /// not the returned save succeeds.
    pub fn set_permanent(&mut self, user_id: &str, assignment: TagAssignment) -> PendingSave {
        self.permanent.insert(user_id.to_string(), assignment);
        self.pending_save()
    }

    pub fn set_temporary(&mut self, user_id: &str, assignment: TagAssignment) {
        self.temporary.insert(user_id.to_string(), assignment);
    }

    /// Removes `user_id` from both partitions.
    ///
    /// Returns whether anything was removed, plus a save when the permanent
    /// partition changed.
    pub fn remove(&mut self, user_id: &str) -> (bool, Option<PendingSave>) {
        let removed_permanent = self.permanent.remove(user_id).is_some();
        let removed_temporary = self.temporary.remove(user_id).is_some();

        let pending = removed_permanent.then(|| self.pending_save());
        (removed_permanent || removed_temporary, pending)
    }

    /// Empties both partitions. The returned save writes the empty
    /// permanent partition.
    pub fn clear_all(&mut self) -> PendingSave {
        self.permanent.clear();
        self.temporary.clear();
        self.pending_save()
    }

    /// Drops every temporary tag. Nothing is persisted.
    pub fn clear_temporary(&mut self) -> usize {
        let count = self.temporary.len();
        self.temporary.clear();
        count
    }

    /// Distinct user ids across both partitions, snapshotted so callers may
    /// mutate the store while walking the list.
    pub fn user_ids(&self) -> Vec<String> {
        self.permanent
            .keys()
            .chain(self.temporary.keys())
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    /// Applies `f` to every permanent assignment.
    pub fn for_each_permanent_mut(&mut self, f: impl FnMut(&mut TagAssignment)) {
        self.permanent.values_mut().for_each(f);
    }

    pub fn permanent(&self) -> &TagMap {
        &self.permanent
    }

    pub fn temporary(&self) -> &TagMap {
        &self.temporary
    }

    pub fn is_permanent(&self, user_id: &str) -> bool {
        self.permanent.contains_key(user_id)
    }

    pub fn is_temporary(&self, user_id: &str) -> bool {
        self.temporary.contains_key(user_id)
    }

    /// Number of entries across both partitions
    pub fn len(&self) -> usize {
        self.permanent.len() + self.temporary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permanent.is_empty() && self.temporary.is_empty()
    }
}
