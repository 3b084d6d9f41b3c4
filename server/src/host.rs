//! In-process host used by the console binary
//!
//! Keeps a list of simulated connected players and records what the tag core
//! writes onto their displays.

use crate::display::{DisplaySink, PlayerHandle, PlayerRegistry};
use log::info;
use std::sync::{Arc, Mutex, RwLock};

/// A connected player whose display state is held in memory.
#[derive(Debug)]
pub struct ConsolePlayer {
    user_id: String,
    nickname: String,
    label: Mutex<Option<String>>,
    color: Mutex<String>,
}

impl ConsolePlayer {
    pub fn new(user_id: &str, nickname: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            label: Mutex::new(None),
            color: Mutex::new(shared::CLEARED_COLOR.to_string()),
        }
    }

    pub fn label(&self) -> Option<String> {
        self.label
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn color(&self) -> String {
        self.color
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DisplaySink for ConsolePlayer {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_label(&self, label: Option<&str>) {
        *self
            .label
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = label.map(str::to_string);
    }

    fn set_color(&self, color: &str) {
        *self
            .color
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = color.to_string();
    }
}

/// Connected players indexed in join order.
#[derive(Default)]
pub struct ConsoleRegistry {
    players: RwLock<Vec<Arc<ConsolePlayer>>>,
}

impl ConsoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a player, replacing any existing connection with the same id.
    pub fn join(&self, user_id: &str, nickname: &str) -> Arc<ConsolePlayer> {
        let player = Arc::new(ConsolePlayer::new(user_id, nickname));
        let mut players = self
            .players
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        players.retain(|existing| existing.user_id != user_id);
        players.push(Arc::clone(&player));
        info!("Player {} ({}) connected", nickname, user_id);
        player
    }

    /// Returns true if the player was connected.
    pub fn leave(&self, user_id: &str) -> bool {
        let mut players = self
            .players
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = players.len();
        players.retain(|existing| existing.user_id != user_id);
        let removed = players.len() != before;
        if removed {
            info!("Player {} disconnected", user_id);
        }
        removed
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<ConsolePlayer>> {
        self.players
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|player| player.user_id == user_id)
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<ConsolePlayer>> {
        self.players
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.players
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PlayerRegistry for ConsoleRegistry {
    fn connected_players(&self) -> Vec<PlayerHandle> {
        self.snapshot()
            .into_iter()
            .map(|player| player as PlayerHandle)
            .collect()
    }
}
