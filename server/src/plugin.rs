use crate::clock::Clock;
use crate::config::TagConfig;
use crate::display::PlayerRegistry;
use crate::events::{EventBridge, EventSubscription, HostEvent};
use crate::persistence::TagPersistence;
use crate::scheduler::TagScheduler;
use crate::service::TagService;
use crate::store::TagStore;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// A running tag subsystem: service, refresh loop and event registration.
///
/// Built by [`TagPlugin::enable`] and torn down by [`TagPlugin::disable`].
pub struct TagPlugin {
    service: Arc<TagService>,
    scheduler: Arc<TagScheduler>,
    events: EventSubscription,
}

impl TagPlugin {
    /// Starts the subsystem, or returns `None` when the configuration
    /// disables it. Must be called from within a Tokio runtime.
    ///
    /// A tag file that cannot be loaded is reported and the store starts
    /// empty; startup continues either way.
    pub async fn enable(
        config: &TagConfig,
        players: Arc<dyn PlayerRegistry>,
        clock: Arc<dyn Clock>,
        persistence: Box<dyn TagPersistence>,
    ) -> Option<Self> {
        if !config.is_enabled {
            info!("Nametag plugin is disabled by configuration");
            return None;
        }

        let store = TagStore::new(persistence);
        let service = Arc::new(TagService::new(config, store, players, clock));
        if let Err(e) = service.load().await {
            error!("Failed to load tag data, starting with no permanent tags: {}", e);
        }

        let scheduler = Arc::new(TagScheduler::new(
            Arc::clone(&service),
            Duration::from_millis(config.tick_interval_ms.max(1)),
        ));
        scheduler.start();

        let events = EventBridge::new(Arc::clone(&service), Arc::clone(&scheduler)).register();

        info!("Nametag plugin enabled");
        Some(Self {
            service,
            scheduler,
            events,
        })
    }

    pub fn service(&self) -> &Arc<TagService> {
        &self.service
    }

    pub fn scheduler(&self) -> &Arc<TagScheduler> {
        &self.scheduler
    }

    /// Channel the host uses to deliver [`HostEvent`]s.
    pub fn events(&self) -> mpsc::Sender<HostEvent> {
        self.events.sender()
    }

    /// Unregisters event handling, cancels the refresh loop, then saves
    /// permanent tags on a best-effort basis.
    pub async fn disable(self) {
        self.events.unregister();
        self.scheduler.stop();
        if let Err(e) = self.service.persist().await {
            warn!("Tag data was not saved during shutdown: {}", e);
        }
        info!("Nametag plugin disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::host::ConsoleRegistry;
    use crate::persistence::YamlFilePersistence;
    use crate::service::TagRequest;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> TagConfig {
        TagConfig {
            folder: dir.path().to_path_buf(),
            tick_interval_ms: 10,
            ..TagConfig::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_config_returns_none() {
        let dir = TempDir::new().unwrap();
        let config = TagConfig {
            is_enabled: false,
            ..test_config(&dir)
        };

        let plugin = TagPlugin::enable(
            &config,
            Arc::new(ConsoleRegistry::new()),
            Arc::new(ManualClock::new(0)),
            Box::new(YamlFilePersistence::new(config.data_file_path())),
        )
        .await;

        assert!(plugin.is_none());
    }

    #[tokio::test]
    async fn test_enable_starts_loop_and_disable_persists() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let plugin = TagPlugin::enable(
            &config,
            Arc::new(ConsoleRegistry::new()),
            Arc::new(ManualClock::new(0)),
            Box::new(YamlFilePersistence::new(config.data_file_path())),
        )
        .await
        .unwrap();
        assert!(plugin.scheduler().is_running());

        plugin
            .service()
            .set_tag("p1", TagRequest::new("Admin", "red").permanent(true))
            .await
            .unwrap();
        let scheduler = Arc::clone(plugin.scheduler());
        plugin.disable().await;

        assert!(!scheduler.is_running());
        let content = fs::read_to_string(config.data_file_path()).unwrap();
        assert!(content.contains("label: Admin"));
    }

    #[tokio::test]
    async fn test_disable_cancels_timer_then_saves() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let plugin = TagPlugin::enable(
            &config,
            Arc::new(ConsoleRegistry::new()),
            Arc::new(ManualClock::new(0)),
            Box::new(YamlFilePersistence::new(config.data_file_path())),
        )
        .await
        .unwrap();
        plugin
            .service()
            .set_tag("p1", TagRequest::new("Admin", "red").permanent(true))
            .await
            .unwrap();
        fs::remove_file(config.data_file_path()).unwrap();

        let scheduler = Arc::clone(plugin.scheduler());
        plugin.disable().await;

        assert!(!scheduler.is_running());
        let content = fs::read_to_string(config.data_file_path()).unwrap();
        assert!(content.contains("label: Admin"));
    }

    #[tokio::test]
    async fn test_enable_survives_corrupted_tag_file() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(config.data_file_path(), "p1:\n  label: [broken").unwrap();

        let plugin = TagPlugin::enable(
            &config,
            Arc::new(ConsoleRegistry::new()),
            Arc::new(ManualClock::new(0)),
            Box::new(YamlFilePersistence::new(config.data_file_path())),
        )
        .await
        .unwrap();

        assert_eq!(plugin.service().tag_count().await, 0);
        plugin
            .service()
            .set_tag("p2", TagRequest::new("Fresh", "red").permanent(true))
            .await
            .unwrap();
        plugin.disable().await;
    }
}
