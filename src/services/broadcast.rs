//! Broadcast notification sink backed by a tokio broadcast channel.
//!
//! Publication is fire-and-forget; a send with no subscribers is fine.
//! Ownership filtering happens at the subscription edge: a receiver built
//! by [`BroadcastNotifier::subscribe`] only ever yields events owned by
//! the subscribing principal.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::ChangeEvent;
use crate::domain::ports::ChangeNotifier;

#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(16));
        Self { tx }
    }

    /// Subscribe on behalf of an authenticated user. Events owned by other
    /// users are filtered out before the caller sees them.
    pub fn subscribe(&self, user_id: Uuid) -> UserEventStream {
        UserEventStream { rx: self.tx.subscribe(), user_id }
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, event: ChangeEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

pub struct UserEventStream {
    rx: broadcast::Receiver<ChangeEvent>,
    user_id: Uuid,
}

impl UserEventStream {
    /// Next event owned by the subscriber. Lagged intervals are skipped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.owner_user_id == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EntityKind;

    #[tokio::test]
    async fn events_are_filtered_by_owner() {
        let notifier = BroadcastNotifier::new(16);
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let mut stream = notifier.subscribe(alice);

        notifier.notify(ChangeEvent::new("created", EntityKind::Task, Uuid::new_v4(), bob));
        let alice_task = Uuid::new_v4();
        notifier.notify(ChangeEvent::new("created", EntityKind::Task, alice_task, alice));

        let event = stream.recv().await.unwrap();
        assert_eq!(event.owner_user_id, alice);
        assert_eq!(event.entity_id, alice_task);
    }

    #[test]
    fn notify_without_subscribers_does_not_panic() {
        let notifier = BroadcastNotifier::new(16);
        notifier.notify(ChangeEvent::new("created", EntityKind::Project, Uuid::new_v4(), Uuid::new_v4()));
    }
}
