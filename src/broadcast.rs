use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::server_protocol::encode_update_state;
use crate::types::ArenaState;

pub type SubscriberId = u64;

/// Encoded `UPDATE_STATE` message, shared between all subscriber queues.
pub type Notification = Arc<str>;

/// Receiving side of a subscription. The first message is always the
/// snapshot taken at subscribe time.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Notification>,
}

/// Fans snapshots out to subscriber queues. Lives inside the engine, so
/// subscribe, publish and unsubscribe are serialized with every mutation.
pub struct BroadcastHub {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Notification>>,
    next_id: SubscriberId,
    queue_capacity: usize,
}

impl BroadcastHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 1,
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn subscribe(&mut self, state: &ArenaState) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        if let Some(initial) = encode(state) {
            let _ = tx.try_send(initial);
        }
        self.subscribers.insert(id, tx);
        info!(subscriber = id, total = self.subscribers.len(), "subscriber connected");
        Subscription { id, rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            info!(subscriber = id, total = self.subscribers.len(), "subscriber disconnected");
        }
        removed
    }

    /// Sends the snapshot to every subscriber without waiting. A full queue
    /// drops the notification for that subscriber; a closed one is removed.
    pub fn publish(&mut self, state: &ArenaState) -> usize {
        if self.subscribers.is_empty() {
            return 0;
        }
        let Some(payload) = encode(state) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in &self.subscribers {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = *id, "subscriber queue full, notification dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            self.unsubscribe(id);
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

fn encode(state: &ArenaState) -> Option<Notification> {
    match encode_update_state(state) {
        Ok(payload) => Some(Arc::from(payload)),
        Err(error) => {
            warn!(%error, "failed to encode arena state");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn main_timer_of(notification: &Notification) -> u64 {
        let value: Value = serde_json::from_str(notification).expect("json");
        value["payload"]["state"]["mainTimer"]
            .as_u64()
            .expect("mainTimer")
    }

    #[test]
    fn subscriber_gets_snapshot_before_updates() {
        let mut hub = BroadcastHub::new(8);
        let mut state = ArenaState::new(100);
        let mut sub = hub.subscribe(&state);

        state.main_timer = 99;
        hub.publish(&state);

        assert_eq!(main_timer_of(&sub.rx.try_recv().expect("initial")), 100);
        assert_eq!(main_timer_of(&sub.rx.try_recv().expect("update")), 99);
        assert!(sub.rx.try_recv().is_err());
    }

    #[test]
    fn publish_reaches_every_subscriber() {
        let mut hub = BroadcastHub::new(8);
        let state = ArenaState::new(10);
        let mut a = hub.subscribe(&state);
        let mut b = hub.subscribe(&state);
        assert_ne!(a.id, b.id);
        assert_eq!(hub.publish(&state), 2);
        for sub in [&mut a, &mut b] {
            assert!(sub.rx.try_recv().is_ok());
            assert!(sub.rx.try_recv().is_ok());
        }
    }

    #[test]
    fn slow_subscriber_drops_without_blocking_others() {
        let mut hub = BroadcastHub::new(2);
        let mut state = ArenaState::new(10);
        let mut slow = hub.subscribe(&state);
        let mut fast = hub.subscribe(&state);

        for remaining in (5..10).rev() {
            state.main_timer = remaining;
            hub.publish(&state);
            while fast.rx.try_recv().is_ok() {}
        }

        assert_eq!(hub.len(), 2);
        assert_eq!(main_timer_of(&slow.rx.try_recv().expect("initial")), 10);
        assert_eq!(main_timer_of(&slow.rx.try_recv().expect("first update")), 9);
        assert!(slow.rx.try_recv().is_err());
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let mut hub = BroadcastHub::new(4);
        let state = ArenaState::new(10);
        let gone = hub.subscribe(&state);
        let _kept = hub.subscribe(&state);
        drop(gone);

        assert_eq!(hub.publish(&state), 1);
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn unsubscribe_closes_the_stream() {
        let mut hub = BroadcastHub::new(4);
        let state = ArenaState::new(10);
        let mut sub = hub.subscribe(&state);
        assert!(hub.unsubscribe(sub.id));
        assert!(!hub.unsubscribe(sub.id));
        assert!(sub.rx.try_recv().is_ok());
        assert!(matches!(
            sub.rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(hub.is_empty());
    }
}
