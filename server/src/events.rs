//! Host event handling
//!
//! The host pushes `HostEvent`s into a channel obtained from
//! [`EventBridge::register`]; a dedicated task drains it and reacts:
//! - Player verified / group changed: reassert the player's tag immediately
//! - Round ended: drop temporary tags
//! - Waiting for players: make sure the refresh loop is alive

use crate::display::PlayerHandle;
use crate::scheduler::TagScheduler;
use crate::service::TagService;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const EVENT_QUEUE_CAPACITY: usize = 1000;

/// Notifications from the host game server
pub enum HostEvent {
    PlayerVerified(PlayerHandle),
    GroupChanged(PlayerHandle),
    RoundEnded,
    WaitingForPlayers,
}

impl fmt::Debug for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::PlayerVerified(player) => {
                write!(f, "PlayerVerified({})", player.user_id())
            }
            HostEvent::GroupChanged(player) => write!(f, "GroupChanged({})", player.user_id()),
            HostEvent::RoundEnded => write!(f, "RoundEnded"),
            HostEvent::WaitingForPlayers => write!(f, "WaitingForPlayers"),
        }
    }
}

#[derive(Clone)]
pub struct EventBridge {
    service: Arc<TagService>,
    scheduler: Arc<TagScheduler>,
}

impl EventBridge {
    pub fn new(service: Arc<TagService>, scheduler: Arc<TagScheduler>) -> Self {
        Self { service, scheduler }
    }

    pub async fn handle(&self, event: HostEvent) {
        debug!("Handling {:?}", event);
        match event {
            HostEvent::PlayerVerified(player) | HostEvent::GroupChanged(player) => {
                self.service.apply_player(&player).await;
            }
            HostEvent::RoundEnded => {
                self.service.end_round().await;
            }
            HostEvent::WaitingForPlayers => {
                self.scheduler.ensure_running();
            }
        }
    }

    /// Subscribes the bridge to a fresh event channel. Events sent through the
    /// returned subscription are handled in order on a background task.
    pub fn register(&self) -> EventSubscription {
        let (sender, mut receiver) = mpsc::channel::<HostEvent>(EVENT_QUEUE_CAPACITY);
        let bridge = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                bridge.handle(event).await;
            }
            debug!("Host event channel closed");
        });
        info!("Registered host event handlers");
        EventSubscription { sender, task }
    }
}

/// Live registration of the event bridge. Dropping it without calling
/// [`EventSubscription::unregister`] leaves the task to end once every sender
/// clone is gone.
pub struct EventSubscription {
    sender: mpsc::Sender<HostEvent>,
    task: JoinHandle<()>,
}

impl EventSubscription {
    pub fn sender(&self) -> mpsc::Sender<HostEvent> {
        self.sender.clone()
    }

    /// Stops handling events. Anything still queued is discarded.
    pub fn unregister(self) {
        self.task.abort();
        info!("Unregistered host event handlers");
    }
}
