use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::event::{ProgressEvent, ProgressStage};

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<ProgressEvent>,
}

struct BusInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Cloneable handle to the process-wide progress bus.
#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<BusInner>,
}

/// Receiving end of one bus subscription. Dropping it unsubscribes.
pub struct BusSubscription {
    pub id: u64,
    receiver: mpsc::Receiver<ProgressEvent>,
}

impl BusSubscription {
    /// Waits for the next event. `None` once the bus has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }
}

impl ProgressBus {
    /// `capacity` bounds each subscriber's queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn subscribe(&self) -> BusSubscription {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, sender });
        debug!(subscriber = id, "Progress bus subscriber registered");
        BusSubscription { id, receiver }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Offers the event to every subscriber in registration order and returns
    /// how many accepted it. Never waits on a subscriber: a full queue
    /// disconnects that subscriber.
    pub fn publish(&self, mut event: ProgressEvent) -> usize {
        event.stamp();
        let request_id = event.request_id.as_deref().unwrap_or("-");
        if event.stage.is_terminal() {
            info!(request_id, stage = ?event.stage, "{}", event.message);
        } else {
            debug!(request_id, stage = ?event.stage, "{}", event.message);
        }

        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        subscribers.retain(|sub| match sub.sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = sub.id, "Progress subscriber fell behind, disconnecting");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = sub.id, "Progress subscriber gone, removing");
                false
            }
        });
        delivered
    }

    /// Builds and publishes an event in one call.
    pub fn emit(
        &self,
        request_id: Option<&str>,
        stage: ProgressStage,
        message: impl Into<String>,
        metadata: Option<Value>,
    ) -> usize {
        let event = ProgressEvent::new(request_id, stage, message);
        match metadata {
            Some(metadata) => self.publish(event.with_metadata(metadata)),
            None => self.publish(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(stage: ProgressStage) -> ProgressEvent {
        ProgressEvent::new(Some("req-1"), stage, "msg")
    }

    #[test]
    fn test_publish_without_subscribers_delivers_nothing() {
        let bus = ProgressBus::new(8);
        assert_eq!(bus.publish(event(ProgressStage::ResumeReceived)), 0);
    }

    #[tokio::test]
    async fn test_publish_stamps_timestamp() {
        let bus = ProgressBus::new(8);
        let mut sub = bus.subscribe();
        bus.publish(event(ProgressStage::ExtractingText));
        let received = sub.recv().await.unwrap();
        assert!(received.timestamp.is_some());
        assert_eq!(received.stage, ProgressStage::ExtractingText);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_no_replay() {
        let bus = ProgressBus::new(8);
        for _ in 0..5 {
            bus.publish(event(ProgressStage::ScrapingSite));
        }
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_none());

        bus.publish(event(ProgressStage::Completed));
        let received = late.recv().await.unwrap();
        assert_eq!(received.stage, ProgressStage::Completed);
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_each_event() {
        let bus = ProgressBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.emit(None, ProgressStage::Testing, "t", Some(json!({"a": 1}))), 2);
        assert_eq!(first.recv().await.unwrap().metadata, Some(json!({"a": 1})));
        assert_eq!(second.recv().await.unwrap().stage, ProgressStage::Testing);
    }

    #[test]
    fn test_full_subscriber_is_disconnected() {
        let bus = ProgressBus::new(2);
        let mut slow = bus.subscribe();
        let mut fast = bus.subscribe();

        bus.publish(event(ProgressStage::ScrapingSite));
        fast.try_recv().unwrap();
        bus.publish(event(ProgressStage::ScrapingSite));
        fast.try_recv().unwrap();
        // slow never drained: third publish overflows its queue
        let delivered = bus.publish(event(ProgressStage::ScrapingSite));

        assert_eq!(delivered, 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(fast.try_recv().is_some());
        assert!(slow.try_recv().is_some());
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let bus = ProgressBus::new(4);
        let sub = bus.subscribe();
        let _kept = bus.subscribe();
        drop(sub);
        assert_eq!(bus.publish(event(ProgressStage::Finalizing)), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_recv_ends() {
        let bus = ProgressBus::new(1);
        let mut sub = bus.subscribe();
        bus.publish(event(ProgressStage::ScrapingSite));
        bus.publish(event(ProgressStage::ScrapingSite)); // overflow, disconnect
        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());
    }
}
