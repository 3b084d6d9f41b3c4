//! Integration tests for the tag subsystem
//!
//! These tests drive the public API end to end: commands and events in,
//! player displays and the tag file out.

use server::clock::ManualClock;
use server::commands;
use server::config::TagConfig;
use server::events::HostEvent;
use server::host::{ConsolePlayer, ConsoleRegistry};
use server::persistence::{TagMap, TagPersistence, YamlFilePersistence};
use server::service::{TagRequest, TagService};
use server::store::TagStore;
use shared::TagAssignment;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

struct Harness {
    service: Arc<TagService>,
    registry: Arc<ConsoleRegistry>,
    clock: Arc<ManualClock>,
    config: TagConfig,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = TagConfig {
        folder: dir.path().to_path_buf(),
        ..TagConfig::default()
    };
    let registry = Arc::new(ConsoleRegistry::new());
    let clock = Arc::new(ManualClock::new(0));
    let store = TagStore::new(Box::new(YamlFilePersistence::new(config.data_file_path())));
    let service = Arc::new(TagService::new(
        &config,
        store,
        registry.clone(),
        clock.clone(),
    ));
    Harness {
        service,
        registry,
        clock,
        config,
        _dir: dir,
    }
}

/// ROTATION TESTS
mod rotation_tests {
    use super::*;

    /// Carousel scenario: "A x B x C" split on `x`, one-second interval, temporary
    #[tokio::test]
    async fn carousel_rotation_and_round_end() {
        let h = harness();
        let player = h.registry.join("P1", "Player One");

        h.service
            .set_tag("P1", TagRequest::new("A x B x C", "red").carousel(1000))
            .await
            .unwrap();
        assert_eq!(player.label().as_deref(), Some("A "));

        h.clock.advance(999);
        h.service.refresh_all().await;
        assert_eq!(player.label().as_deref(), Some("A "));

        h.clock.advance(1);
        h.service.refresh_all().await;
        assert_eq!(player.label().as_deref(), Some(" B "));

        h.clock.advance(1000);
        h.service.refresh_all().await;
        assert_eq!(player.label().as_deref(), Some(" C"));

        h.clock.advance(1000);
        h.service.refresh_all().await;
        assert_eq!(player.label().as_deref(), Some("A "));

        h.service.end_round().await;
        assert!(h.service.lookup("P1").await.is_none());
    }

    /// Rainbow color returns to its starting palette slot after one full cycle
    #[tokio::test]
    async fn rainbow_cycles_through_palette() {
        let h = harness();
        let player = h.registry.join("P1", "Player One");
        h.service
            .set_tag("P1", TagRequest::new("Shiny", "").rainbow(true))
            .await
            .unwrap();
        let start = h.service.lookup("P1").await.unwrap().rainbow_index;

        let mut seen = Vec::new();
        for _ in 0..h.config.rainbow_color_names.len() {
            h.service.refresh_all().await;
            seen.push(player.color());
        }

        assert_eq!(h.service.lookup("P1").await.unwrap().rainbow_index, start);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), h.config.rainbow_color_names.len());
    }

    /// Offline players keep their rotation state frozen
    #[tokio::test]
    async fn offline_players_are_not_rotated() {
        let h = harness();
        h.service
            .set_tag("P1", TagRequest::new("Shiny", "").rainbow(true))
            .await
            .unwrap();

        for _ in 0..5 {
            h.service.refresh_all().await;
        }

        assert_eq!(h.service.lookup("P1").await.unwrap().rainbow_index, 0);
    }
}

/// STORE AND PERSISTENCE TESTS
mod persistence_tests {
    use super::*;

    /// Permanent tag shadows the temporary one until it is removed
    #[tokio::test]
    async fn permanent_shadows_temporary() {
        let h = harness();
        let player = h.registry.join("P1", "Player One");

        h.service
            .set_tag("P1", TagRequest::new("Guest", "blue"))
            .await
            .unwrap();
        h.service
            .set_tag("P1", TagRequest::new("Admin", "red").permanent(true))
            .await
            .unwrap();
        h.service.refresh_all().await;
        assert_eq!(player.label().as_deref(), Some("Admin"));

        assert!(h.service.remove_tag("P1").await.unwrap());
        assert!(h.service.lookup("P1").await.is_none());
        assert!(!h.service.remove_tag("P1").await.unwrap());
    }

    /// Round end leaves the permanent file byte-for-byte unchanged
    #[tokio::test]
    async fn round_end_leaves_permanent_file_untouched() {
        let h = harness();
        h.service
            .set_tag("P1", TagRequest::new("Admin", "red").permanent(true))
            .await
            .unwrap();
        h.service
            .set_tag("P2", TagRequest::new("Guest", "blue"))
            .await
            .unwrap();
        let before = fs::read(h.config.data_file_path()).unwrap();

        assert_eq!(h.service.end_round().await, 1);

        assert_eq!(fs::read(h.config.data_file_path()).unwrap(), before);
        assert!(h.service.lookup("P1").await.is_some());
    }

    /// Permanent tags survive a restart, temporary ones do not
    #[tokio::test]
    async fn restart_restores_permanent_tags() {
        let h = harness();
        h.service
            .set_tag(
                "P1",
                TagRequest::new("OnexTwo", "gold").permanent(true).carousel(500),
            )
            .await
            .unwrap();
        h.service
            .set_tag("P2", TagRequest::new("Guest", "blue"))
            .await
            .unwrap();

        let restarted = TagService::new(
            &h.config,
            TagStore::new(Box::new(YamlFilePersistence::new(h.config.data_file_path()))),
            h.registry.clone(),
            Arc::new(ManualClock::new(0)),
        );
        assert_eq!(restarted.load().await.unwrap(), 1);

        let restored = restarted.lookup("P1").await.unwrap();
        assert_eq!(restored.carousel_labels, vec!["One", "Two"]);
        assert_eq!(restored.carousel_interval_ms, 500);
        assert!(restarted.lookup("P2").await.is_none());
    }

    /// A truncated tag file loads as empty and later saves work
    #[tokio::test]
    async fn corrupted_file_recovers() {
        let h = harness();
        fs::write(
            h.config.data_file_path(),
            "P1:\n  label: Admin\n  color_spec: [unterminated",
        )
        .unwrap();

        assert_err!(h.service.load().await);
        assert_eq!(h.service.tag_count().await, 0);

        h.service
            .set_tag("P2", TagRequest::new("Fresh", "red").permanent(true))
            .await
            .unwrap();
        assert_ok!(h.service.persist().await);

        let saved = YamlFilePersistence::new(h.config.data_file_path())
            .load()
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved.contains_key("P2"));
    }

    /// The tag file is a plain YAML mapping readable by other tools
    #[test]
    fn tag_file_is_plain_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playertags.yml");
        let mut tags = TagMap::new();
        tags.insert(
            "76561198000000001@steam".to_string(),
            TagAssignment::new("Admin", "#FF0090", false, true),
        );
        YamlFilePersistence::new(&path).save(&tags).unwrap();

        let raw: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &raw["76561198000000001@steam"];
        assert_eq!(entry["label"].as_str(), Some("Admin"));
        assert_eq!(entry["color_spec"].as_str(), Some("#FF0090"));
        assert_eq!(entry["is_rainbow"].as_bool(), Some(false));
    }
}

/// COMMAND AND EVENT TESTS
mod command_event_tests {
    use super::*;
    use server::events::EventBridge;
    use server::scheduler::TagScheduler;

    /// A full admin session through the command surface
    #[tokio::test]
    async fn command_session() {
        let h = harness();
        let alice = h.registry.join("76561198000000001@steam", "Alice");
        h.registry.join("76561198000000002@steam", "Bob");

        let outcome = commands::execute(&h.service, "tags alice red Admin true")
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.response);
        assert_eq!(alice.color(), "#C50000");

        let outcome = commands::execute(&h.service, "ctags bob rainbow AxB 1000 false")
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.response);

        let outcome = commands::execute(&h.service, "ctags bob red AxB soon false")
            .await
            .unwrap();
        assert!(!outcome.success);

        let outcome = commands::execute(&h.service, "tagsfall").await.unwrap();
        assert_eq!(outcome.response, "Removed tags of all players (2 players)");
        assert_eq!(alice.label(), None);
    }

    /// A player joining mid-round gets their tag before the next tick
    #[tokio::test]
    async fn join_event_applies_immediately() {
        let h = harness();
        h.service
            .set_tag("P1", TagRequest::new("Veteran", "emerald").permanent(true))
            .await
            .unwrap();

        let scheduler = Arc::new(TagScheduler::new(
            Arc::clone(&h.service),
            Duration::from_secs(3600),
        ));
        let bridge = EventBridge::new(Arc::clone(&h.service), scheduler);

        let player: Arc<ConsolePlayer> = h.registry.join("P1", "Player One");
        bridge.handle(HostEvent::PlayerVerified(player.clone())).await;

        assert_eq!(player.label().as_deref(), Some("Veteran"));
        assert_eq!(player.color(), "#50C878");
    }
}
