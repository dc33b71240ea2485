use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::protocol::{ClientCommand, ServerMessage};
use crate::progress::event::now_rfc3339;
use crate::progress::ProgressEvent;

pub type ClientId = u64;

/// Which request ids a connection wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Subscription {
    /// Default for a fresh connection.
    #[default]
    All,
    /// Explicit set. Empty means "nothing tagged with a request id".
    Only(HashSet<String>),
}

impl Subscription {
    /// Untagged events reach everyone.
    pub fn wants(&self, request_id: Option<&str>) -> bool {
        match (self, request_id) {
            (_, None) => true,
            (Subscription::All, Some(_)) => true,
            (Subscription::Only(ids), Some(id)) => ids.contains(id),
        }
    }

    pub fn subscribe(&mut self, request_id: String) {
        match self {
            Subscription::All => *self = Subscription::Only(HashSet::from([request_id])),
            Subscription::Only(ids) => {
                ids.insert(request_id);
            }
        }
    }

    /// No-op while in `All` mode.
    pub fn unsubscribe(&mut self, request_id: &str) {
        if let Subscription::Only(ids) = self {
            ids.remove(request_id);
        }
    }
}

struct ClientEntry {
    subscription: Subscription,
    outbound: mpsc::Sender<String>,
}

/// Outcome of fanning one event out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub filtered: usize,
    pub dropped: usize,
}

/// The set of connected observers. Connect, disconnect and subscription
/// changes run concurrently with dispatch.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, ClientEntry>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection whose writer drains `outbound`.
    pub fn register(&self, outbound: mpsc::Sender<String>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ClientEntry {
                    subscription: Subscription::default(),
                    outbound,
                },
            );
        debug!(client = id, "Progress observer connected");
        id
    }

    pub fn remove(&self, id: ClientId) -> bool {
        let removed = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(client = id, "Progress observer removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn subscription(&self, id: ClientId) -> Option<Subscription> {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|c| c.subscription.clone())
    }

    /// Applies a command from client `id` and returns the reply to send back.
    pub fn apply(&self, id: ClientId, command: ClientCommand) -> ServerMessage {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        let Some(client) = clients.get_mut(&id) else {
            return ServerMessage::Error {
                message: "Connection is no longer registered".to_string(),
            };
        };

        match command {
            ClientCommand::Subscribe { request_id } => {
                client.subscription.subscribe(request_id.clone());
                ServerMessage::Subscribed { request_id }
            }
            ClientCommand::Unsubscribe { request_id } => {
                client.subscription.unsubscribe(&request_id);
                ServerMessage::Unsubscribed { request_id }
            }
            ClientCommand::SubscribeAll => {
                client.subscription = Subscription::All;
                ServerMessage::SubscribedAll
            }
            ClientCommand::Ping => ServerMessage::Pong {
                timestamp: now_rfc3339(),
            },
        }
    }

    /// Queues a direct reply for one client. Returns false if it could not be queued.
    pub fn send_to(&self, id: ClientId, message: &ServerMessage) -> bool {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients
            .get(&id)
            .map(|c| c.outbound.try_send(message.to_json()).is_ok())
            .unwrap_or(false)
    }

    /// Fans one event out to every interested client. Clients whose queue is
    /// full or whose writer has gone away are removed.
    pub fn dispatch(&self, event: &ProgressEvent) -> DispatchReport {
        let payload = ServerMessage::Progress(event.clone()).to_json();
        let request_id = event.request_id.as_deref();

        let mut report = DispatchReport::default();
        let mut stale: Vec<ClientId> = Vec::new();
        {
            let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
            for (id, client) in clients.iter() {
                if !client.subscription.wants(request_id) {
                    report.filtered += 1;
                    continue;
                }
                match client.outbound.try_send(payload.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(client = id, "Progress observer is not keeping up, disconnecting");
                        stale.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => stale.push(*id),
                }
            }
        }

        if !stale.is_empty() {
            let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
            for id in &stale {
                clients.remove(id);
            }
            report.dropped = stale.len();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStage;

    fn tagged(id: &str) -> ProgressEvent {
        ProgressEvent::new(Some(id), ProgressStage::ScrapingSite, "tagged")
    }

    fn untagged() -> ProgressEvent {
        ProgressEvent::new(None, ProgressStage::ScrapingSite, "untagged")
    }

    fn connect(registry: &ClientRegistry, capacity: usize) -> (ClientId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (registry.register(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    #[test]
    fn test_new_client_receives_everything() {
        let registry = ClientRegistry::new();
        let (_, mut rx) = connect(&registry, 8);
        registry.dispatch(&tagged("a"));
        registry.dispatch(&tagged("b"));
        registry.dispatch(&untagged());
        assert_eq!(drain(&mut rx).len(), 3);
    }

    #[test]
    fn test_subscribe_narrows_after_subscribe_all() {
        let registry = ClientRegistry::new();
        let (id, mut rx) = connect(&registry, 8);

        registry.apply(id, ClientCommand::SubscribeAll);
        let reply = registry.apply(
            id,
            ClientCommand::Subscribe {
                request_id: "X".to_string(),
            },
        );
        assert_eq!(
            reply,
            ServerMessage::Subscribed {
                request_id: "X".to_string()
            }
        );

        registry.dispatch(&tagged("Y"));
        registry.dispatch(&tagged("X"));
        registry.dispatch(&untagged());

        let received = drain(&mut rx);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0]["requestId"], "X");
        assert!(received[1].get("requestId").is_none());
    }

    #[test]
    fn test_empty_explicit_set_receives_only_untagged() {
        let registry = ClientRegistry::new();
        let (id, mut rx) = connect(&registry, 8);
        registry.apply(
            id,
            ClientCommand::Subscribe {
                request_id: "X".to_string(),
            },
        );
        registry.apply(
            id,
            ClientCommand::Unsubscribe {
                request_id: "X".to_string(),
            },
        );
        assert_eq!(
            registry.subscription(id),
            Some(Subscription::Only(HashSet::new()))
        );

        let report = registry.dispatch(&tagged("X"));
        assert_eq!(report.filtered, 1);
        registry.dispatch(&untagged());
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_unsubscribe_in_all_mode_keeps_all() {
        let mut subscription = Subscription::All;
        subscription.unsubscribe("X");
        assert_eq!(subscription, Subscription::All);
    }

    #[test]
    fn test_subscribe_all_resets_explicit_set() {
        let registry = ClientRegistry::new();
        let (id, _rx) = connect(&registry, 8);
        registry.apply(
            id,
            ClientCommand::Subscribe {
                request_id: "X".to_string(),
            },
        );
        assert_eq!(
            registry.apply(id, ClientCommand::SubscribeAll),
            ServerMessage::SubscribedAll
        );
        assert_eq!(registry.subscription(id), Some(Subscription::All));
    }

    #[test]
    fn test_ping_replies_pong() {
        let registry = ClientRegistry::new();
        let (id, _rx) = connect(&registry, 8);
        assert!(matches!(
            registry.apply(id, ClientCommand::Ping),
            ServerMessage::Pong { .. }
        ));
    }

    #[test]
    fn test_full_client_is_dropped_without_affecting_others() {
        let registry = ClientRegistry::new();
        let (_slow, _slow_rx) = connect(&registry, 1);
        let (_fast, mut fast_rx) = connect(&registry, 8);

        registry.dispatch(&untagged());
        let report = registry.dispatch(&untagged());

        assert_eq!(report.dropped, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(drain(&mut fast_rx).len(), 2);
    }

    #[test]
    fn test_closed_client_is_removed_on_dispatch() {
        let registry = ClientRegistry::new();
        let (_, rx) = connect(&registry, 4);
        drop(rx);
        let report = registry.dispatch(&untagged());
        assert_eq!(report.dropped, 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_apply_for_unknown_client_is_error() {
        let registry = ClientRegistry::new();
        assert!(matches!(
            registry.apply(42, ClientCommand::SubscribeAll),
            ServerMessage::Error { .. }
        ));
    }
}
