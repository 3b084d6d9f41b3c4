//! # Nametag Server Library
//!
//! This library keeps a displayed tag (a rank label plus a color) for every
//! player connected to a game server, and refreshes those tags on a fixed
//! short period so that animated tags keep moving.
//!
//! ## Tag Kinds
//!
//! ### Static
//! A fixed label in a fixed color. The color is a name looked up in the
//! configured color table, or a literal such as `#FF96DE`.
//!
//! ### Rainbow
//! The color steps through the configured palette, one entry per refresh.
//!
//! ### Carousel
//! The label is split on a delimiter (`x` by default) and the display
//! rotates through the pieces, advancing at most once per configured
//! interval regardless of the refresh rate. Carousel and rainbow combine.
//!
//! ### Permanent and Temporary
//! Permanent tags are written to a YAML file and survive restarts. Temporary
//! tags live until the round ends. When a player has both, the permanent one
//! is displayed.
//!
//! ## Architecture Design
//!
//! ### One Core Object
//! [`service::TagService`] owns the tag store, the update engine, the player
//! registry and the clock. It is built once at startup and shared by `Arc`
//! with the scheduler, the event bridge and the command surface. All tag
//! state sits behind a single coarse lock.
//!
//! ### Refresh Loop
//! [`scheduler::TagScheduler`] runs one Tokio task ticking on an interval
//! (100ms by default). Each tick walks every connected player, computes
//! their tag and writes it to the host's display. A player whose update
//! fails (bad record, panicking display) is logged and skipped; the loop
//! keeps running.
//!
//! ### Host Events
//! [`events::EventBridge`] reacts to host notifications delivered over a
//! channel: newly verified players and group changes get their tag
//! reapplied immediately, and round end drops temporary tags.
//!
//! ## Module Organization
//!
//! - `config`: YAML configuration with defaults for palette and colors
//! - `error`: the crate error type
//! - `clock`: monotonic millisecond clocks
//! - `display`: traits the host implements for players and their displays
//! - `host`: an in-process host used by the console binary
//! - `persistence`: atomic YAML storage for permanent tags
//! - `store`: permanent and temporary tag partitions
//! - `engine`: per-tick label and color computation
//! - `service`: the core object tying it together
//! - `scheduler`: the refresh loop
//! - `events`: host event handling
//! - `commands`: console commands for managing tags
//! - `plugin`: startup and shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::clock::MonotonicClock;
//! use server::config::TagConfig;
//! use server::host::ConsoleRegistry;
//! use server::persistence::YamlFilePersistence;
//! use server::plugin::TagPlugin;
//! use server::service::TagRequest;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TagConfig::default();
//!     let players = Arc::new(ConsoleRegistry::new());
//!     let persistence = YamlFilePersistence::new(config.data_file_path());
//!
//!     let plugin = TagPlugin::enable(
//!         &config,
//!         players.clone(),
//!         Arc::new(MonotonicClock::new()),
//!         Box::new(persistence),
//!     )
//!     .await
//!     .expect("plugin enabled");
//!
//!     players.join("76561198000000001@steam", "Alice");
//!     plugin
//!         .service()
//!         .set_tag(
//!             "76561198000000001@steam",
//!             TagRequest::new("FirstxSecond", "gold").carousel(1500).permanent(true),
//!         )
//!         .await
//!         .ok();
//!
//!     plugin.disable().await;
//! }
//! ```

pub mod clock;
pub mod commands;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod persistence;
pub mod plugin;
pub mod scheduler;
pub mod service;
pub mod store;
