//! Host-side interfaces the tag core writes into
//!
//! The host game server owns connected players. The core only needs to
//! enumerate them, find one by id or name, and push a label and color onto
//! their display.

use std::sync::Arc;

/// A connected player's displayed rank label and color.
///
/// Implementations live on the host side and are expected to use interior
/// mutability, since handles are shared between the scheduler and event tasks.
///
/// Setters should not panic. A panic is caught and the player is skipped for
/// that tick, but the process panic hook still runs first, so a sink that
/// panics on every write prints a panic message every tick.
pub trait DisplaySink: Send + Sync {
    /// Stable player identity used as the tag store key
    fn user_id(&self) -> &str;
    fn nickname(&self) -> &str;
    /// `None` clears the label
    fn set_label(&self, label: Option<&str>);
    fn set_color(&self, color: &str);
}

pub type PlayerHandle = Arc<dyn DisplaySink>;

/// Registry of currently connected players.
pub trait PlayerRegistry: Send + Sync {
    fn connected_players(&self) -> Vec<PlayerHandle>;

    /// Finds a connected player by exact user id.
    fn player_by_id(&self, user_id: &str) -> Option<PlayerHandle> {
        self.connected_players()
            .into_iter()
            .find(|player| player.user_id() == user_id)
    }

    /// Finds a connected player by user id, falling back to a
    /// case-insensitive nickname match.
    fn find_player(&self, query: &str) -> Option<PlayerHandle> {
        let players = self.connected_players();
        if let Some(player) = players.iter().find(|player| player.user_id() == query) {
            return Some(Arc::clone(player));
        }
        players
            .into_iter()
            .find(|player| player.nickname().eq_ignore_ascii_case(query))
    }
}
