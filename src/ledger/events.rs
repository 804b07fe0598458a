//! Ledger event subscriptions
//!
//! Four marketplace event topics, filtered by the session account, drive
//! the refresh loop. The [`EventHub`] is the registration surface: a
//! thread-safe handler registry fed by the WebSocket event feed. The
//! [`EventBridge`] owns exactly four handler slots for a session and tears
//! them down atomically, so repeated mount/unmount cycles never leak or
//! duplicate registrations.

use dashmap::DashMap;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::engine::RefreshHandle;
use crate::types::{Address, Result, WharfError};

/// Delay before the feed task retries a failed connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Marketplace event topics watched for the session account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    #[serde(rename = "NFTSold")]
    NftSold,
    DaoJoined,
    ClusterJoined,
    DeviceSold,
}

impl EventTopic {
    /// Every topic the bridge registers for a session.
    pub const ALL: [EventTopic; 4] = [
        EventTopic::NftSold,
        EventTopic::DaoJoined,
        EventTopic::ClusterJoined,
        EventTopic::DeviceSold,
    ];
}

/// One event frame from the ledger feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub topic: EventTopic,
    /// Recipient account the event is scoped to.
    pub account: Address,
}

/// Opaque registration handle returned by [`EventHub::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn() + Send + Sync>;

struct HandlerEntry {
    topic: EventTopic,
    account: Address,
    handler: Handler,
}

/// Thread-safe registry of event handlers, indexed by registration id.
pub struct EventHub {
    handlers: DashMap<u64, HandlerEntry>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for one topic, scoped to one account.
    pub fn register(&self, topic: EventTopic, account: Address, handler: Handler) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(
            id,
            HandlerEntry {
                topic,
                account,
                handler,
            },
        );
        debug!(?topic, id, "Event handler registered");
        HandlerId(id)
    }

    /// Remove a registration. Returns false if the id was already gone.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let removed = self.handlers.remove(&id.0).is_some();
        if removed {
            debug!(id = id.0, "Event handler unregistered");
        }
        removed
    }

    /// Number of handlers currently registered for a topic.
    pub fn handler_count(&self, topic: EventTopic) -> usize {
        self.handlers
            .iter()
            .filter(|entry| entry.topic == topic)
            .count()
    }

    /// Fire every handler whose topic and account match the event.
    pub fn dispatch(&self, event: &LedgerEvent) {
        let mut fired = 0usize;
        for entry in self.handlers.iter() {
            if entry.topic == event.topic && entry.account == event.account {
                (entry.handler)();
                fired += 1;
            }
        }
        debug!(topic = ?event.topic, fired, "Ledger event dispatched");
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

enum BridgeState {
    Idle,
    Subscribed { ids: [HandlerId; 4] },
}

/// Binds the four watched topics to the refresh handle for one account.
///
/// Two states: idle (no registrations) and subscribed (all four topics).
/// Teardown removes exactly the handlers this bridge registered; dropping
/// the bridge tears down implicitly.
pub struct EventBridge {
    hub: Arc<EventHub>,
    account: Address,
    state: BridgeState,
}

impl EventBridge {
    pub fn new(hub: Arc<EventHub>, account: Address) -> Self {
        Self {
            hub,
            account,
            state: BridgeState::Idle,
        }
    }

    /// Register the four topic handlers, each bumping the same refresh
    /// generation. Re-subscribing while already subscribed is rejected so
    /// repeated mounts cannot double-register.
    pub fn subscribe(&mut self, refresh: &RefreshHandle) -> Result<()> {
        if matches!(self.state, BridgeState::Subscribed { .. }) {
            return Err(WharfError::Subscription(
                "event bridge is already subscribed".to_string(),
            ));
        }

        let ids = EventTopic::ALL.map(|topic| {
            let handle = refresh.clone();
            self.hub.register(
                topic,
                self.account.clone(),
                Arc::new(move || handle.trigger()),
            )
        });

        info!(account = %self.account, "Event bridge subscribed to all topics");
        self.state = BridgeState::Subscribed { ids };
        Ok(())
    }

    /// Unregister exactly the handlers this bridge registered. Idempotent.
    pub fn teardown(&mut self) {
        if let BridgeState::Subscribed { ids } =
            std::mem::replace(&mut self.state, BridgeState::Idle)
        {
            for id in ids {
                self.hub.unregister(id);
            }
            info!(account = %self.account, "Event bridge torn down");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, BridgeState::Subscribed { .. })
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Read ledger events from the WebSocket feed and dispatch into the hub.
///
/// Reconnects with a fixed delay on any failure; malformed frames are
/// logged and skipped so one bad event cannot stall the feed.
pub fn spawn_event_feed(ws_url: String, hub: Arc<EventHub>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match connect_async(&ws_url).await {
                Ok((stream, _)) => {
                    info!(url = %ws_url, "Ledger event feed connected");
                    let (_, mut read) = stream.split();

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<LedgerEvent>(&text) {
                                    Ok(event) => hub.dispatch(&event),
                                    Err(e) => warn!("Malformed ledger event frame: {}", e),
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(e) => {
                                warn!("Ledger event feed error: {}", e);
                                break;
                            }
                        }
                    }
                    warn!("Ledger event feed disconnected, reconnecting");
                }
                Err(e) => warn!("Ledger event feed connect failed: {}", e),
            }

            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}
