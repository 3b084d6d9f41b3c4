//! The tag core shared by the scheduler, event bridge and commands
//!
//! `TagService` is constructed once at startup and handed out behind an
//! `Arc`. All store and rotation state sits behind one coarse lock: every
//! operation is short, and holding the lock across a whole tick keeps ticks
//! and host events from interleaving mid-update.
//!
//! Disk writes never happen under that lock. A mutation snapshots the
//! permanent partition, queues on a separate save lock, releases the store
//! and writes the snapshot on the blocking pool. The save lock is taken
//! before the store is released, so snapshots reach disk in mutation order.

use crate::clock::Clock;
use crate::config::TagConfig;
use crate::display::{PlayerHandle, PlayerRegistry};
use crate::engine::TagEngine;
use crate::error::{Result, TagError};
use crate::store::{PendingSave, TagStore};
use log::{debug, error, info, trace};
use shared::{split_carousel_labels, ColorTable, DisplayTag, TagAssignment, CLEARED_COLOR, DEFAULT_COLOR};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Parameters for assigning a tag to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRequest {
    pub label: String,
    /// Color name or literal; ignored for rainbow tags
    pub color: String,
    pub rainbow: bool,
    pub permanent: bool,
    /// `Some` turns the label into a carousel rotating at this interval
    pub carousel_interval_ms: Option<u64>,
}

impl TagRequest {
    pub fn new(label: &str, color: &str) -> Self {
        Self {
            label: label.to_string(),
            color: color.to_string(),
            rainbow: false,
            permanent: false,
            carousel_interval_ms: None,
        }
    }

    pub fn rainbow(mut self, rainbow: bool) -> Self {
        self.rainbow = rainbow;
        self
    }

    pub fn permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    pub fn carousel(mut self, interval_ms: u64) -> Self {
        self.carousel_interval_ms = Some(interval_ms);
        self
    }
}

/// Outcome of one refresh pass over connected players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub applied: usize,
    pub failed: usize,
}

enum ApplyOutcome {
    Applied(DisplayTag),
    NoTag,
    Failed,
}

pub struct TagService {
    store: RwLock<TagStore>,
    /// Serialises snapshot writes
    save_order: Mutex<()>,
    engine: TagEngine,
    players: Arc<dyn PlayerRegistry>,
    clock: Arc<dyn Clock>,
    carousel_delimiter: char,
}

impl TagService {
    pub fn new(
        config: &TagConfig,
        store: TagStore,
        players: Arc<dyn PlayerRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = TagEngine::new(
            config.rainbow_color_names.clone(),
            ColorTable::new(config.available_colors.clone()),
        );
        Self {
            store: RwLock::new(store),
            save_order: Mutex::new(()),
            engine,
            players,
            clock,
            carousel_delimiter: config.carousel_delimiter,
        }
    }

    /// Loads permanent tags and prepares them for rotation.
    ///
    /// Loaded records are normalised against the current palette, and their
    /// carousel stamps from the previous run are rebased onto this run's
    /// clock. Temporary tags are left alone. A load failure leaves the
    /// permanent partition empty and is returned for reporting.
    pub async fn load(&self) -> Result<usize> {
        let mut store = self.store.write().await;
        let loaded = store.load()?;

        let now = self.clock.now_millis();
        let palette_len = self.engine.palette().len();
        let mut repaired = 0;
        store.for_each_permanent_mut(|assignment| {
            if assignment.normalize(palette_len) {
                repaired += 1;
            }
            if assignment.is_carousel {
                assignment.last_carousel_update = now;
            }
        });
        if repaired > 0 {
            info!("Repaired rotation state of {} loaded tags", repaired);
        }

        Ok(loaded)
    }

    pub async fn persist(&self) -> Result<()> {
        let store = self.store.read().await;
        let pending = store.pending_save();
        self.write_out(store, pending).await
    }

    /// Assigns a tag and shows it right away if the player is online.
    ///
    /// A persist failure is returned after the tag has already been stored
    /// and applied in memory.
    pub async fn set_tag(&self, user_id: &str, request: TagRequest) -> Result<()> {
        let now = self.clock.now_millis();
        let color = if request.rainbow {
            DEFAULT_COLOR
        } else {
            request.color.as_str()
        };
        let mut assignment =
            TagAssignment::new(&request.label, color, request.rainbow, request.permanent);

        if let Some(interval_ms) = request.carousel_interval_ms {
            let labels = split_carousel_labels(&request.label, self.carousel_delimiter);
            debug!("Carousel labels for {}: {:?}", user_id, labels);
            assignment = assignment
                .with_carousel(labels, interval_ms, now)
                .ok_or_else(|| {
                    TagError::InvalidArgument(format!(
                        "carousel label '{}' has no segments",
                        request.label
                    ))
                })?;
        }

        let mut store = self.store.write().await;
        let pending = if request.permanent {
            Some(store.set_permanent(user_id, assignment))
        } else {
            store.set_temporary(user_id, assignment);
            None
        };

        if let Some(player) = self.players.player_by_id(user_id) {
            self.apply_to(&mut store, &player, now);
        }

        match pending {
            Some(pending) => self.write_out(store, pending).await,
            None => Ok(()),
        }
    }

    /// Removes a player's tag from both partitions and clears their display
    /// if they are online. Returns whether a tag existed.
    pub async fn remove_tag(&self, user_id: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        let (removed, pending) = store.remove(user_id);

        if removed {
            if let Some(player) = self.players.player_by_id(user_id) {
                reset_display(&player);
            }
        }

        if let Some(pending) = pending {
            self.write_out(store, pending).await?;
        }
        Ok(removed)
    }

    /// Removes every tag, clearing the display of each online owner.
    /// Returns the number of distinct players that had a tag.
    pub async fn clear_all(&self) -> Result<usize> {
        let mut store = self.store.write().await;
        let user_ids = store.user_ids();

        for user_id in &user_ids {
            if let Some(player) = self.players.player_by_id(user_id) {
                reset_display(&player);
            }
        }

        let pending = store.clear_all();
        self.write_out(store, pending).await?;
        info!("Cleared tags of {} players", user_ids.len());
        Ok(user_ids.len())
    }

    /// Drops all temporary tags. Permanent tags are untouched.
    pub async fn end_round(&self) -> usize {
        let cleared = self.store.write().await.clear_temporary();
        info!("Round ended, cleared {} temporary tags", cleared);
        cleared
    }

    /// Recomputes and applies one player's tag outside the tick cadence.
    pub async fn apply_player(&self, player: &PlayerHandle) -> Option<DisplayTag> {
        let mut store = self.store.write().await;
        let now = self.clock.now_millis();
        match self.apply_to(&mut store, player, now) {
            ApplyOutcome::Applied(display) => {
                debug!(
                    "Applied tag of {}: [{}]{}",
                    player.nickname(),
                    display.color,
                    display.label
                );
                Some(display)
            }
            ApplyOutcome::NoTag | ApplyOutcome::Failed => None,
        }
    }

    /// One scheduler tick: refresh every connected player that has a tag.
    ///
    /// A failing player is logged and counted; the rest are still processed.
    pub async fn refresh_all(&self) -> TickReport {
        let players = self.players.connected_players();
        let mut store = self.store.write().await;
        let now = self.clock.now_millis();

        let mut report = TickReport::default();
        for player in &players {
            match self.apply_to(&mut store, player, now) {
                ApplyOutcome::Applied(_) => report.applied += 1,
                ApplyOutcome::Failed => report.failed += 1,
                ApplyOutcome::NoTag => {}
            }
        }
        report
    }

    pub async fn lookup(&self, user_id: &str) -> Option<TagAssignment> {
        self.store.read().await.get(user_id).cloned()
    }

    /// Number of stored entries across both partitions
    pub async fn tag_count(&self) -> usize {
        self.store.read().await.len()
    }

    /// Known color names and their literals, sorted by name.
    pub fn available_colors(&self) -> Vec<(String, String)> {
        self.engine.colors().entries()
    }

    pub fn players(&self) -> &Arc<dyn PlayerRegistry> {
        &self.players
    }

    /// Releases `store_guard` and writes `pending` on the blocking pool.
    async fn write_out<G>(&self, store_guard: G, pending: PendingSave) -> Result<()> {
        let _order = self.save_order.lock().await;
        drop(store_guard);

        tokio::task::spawn_blocking(move || pending.write())
            .await
            .map_err(|e| TagError::Persist(format!("save task failed: {}", e)))?
    }

    fn apply_to(&self, store: &mut TagStore, player: &PlayerHandle, now: u64) -> ApplyOutcome {
        let Some(assignment) = store.get_mut(player.user_id()) else {
            return ApplyOutcome::NoTag;
        };

        // The sink is host code; a panic there must not take the tick down
        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<DisplayTag> {
            let display = self.engine.compute(assignment, now)?;
            player.set_label(Some(&display.label));
            player.set_color(&display.color);
            Ok(display)
        }));

        match result {
            Ok(Ok(display)) => {
                trace!(
                    "Set tag of {}: [{}]{}",
                    player.nickname(),
                    display.color,
                    display.label
                );
                ApplyOutcome::Applied(display)
            }
            Ok(Err(e)) => {
                error!("Failed to update tag of {}: {}", player.nickname(), e);
                ApplyOutcome::Failed
            }
            Err(_) => {
                error!("Display update for {} panicked", player.nickname());
                ApplyOutcome::Failed
            }
        }
    }
}

fn reset_display(player: &PlayerHandle) {
    player.set_label(None);
    player.set_color(CLEARED_COLOR);
}
