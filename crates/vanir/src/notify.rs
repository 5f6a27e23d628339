//! # Change Notification — the Store's Outward Boundary
//!
//! External collaborators (inspectors, renderers, editor panels) are not
//! part of the simulation core; they observe it. [`ReactiveNotifier`] is the
//! thin pub/sub layer that carries [`SceneEvent`]s out of the store over
//! plain mpsc channels: call
//! [`SceneStore::subscribe`](crate::store::SceneStore::subscribe) to get a
//! [`Receiver`], drain it between ticks, drop it to unsubscribe.
//!
//! Emission is synchronous and never blocks — senders whose receiver has
//! gone away are pruned on the next emit.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::component::ComponentKind;
use crate::entity::EntityId;

/// A structural or data change inside the scene store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    EntityCreated(EntityId),
    EntityDestroyed(EntityId),
    ActiveChanged { entity: EntityId, active: bool },
    Renamed { entity: EntityId },
    Reparented { child: EntityId, parent: Option<EntityId> },
    ComponentAdded { entity: EntityId, kind: ComponentKind },
    ComponentRemoved { entity: EntityId, kind: ComponentKind },
    /// In-place data mutation. Does not invalidate query membership, but any
    /// snapshot copies a collaborator holds are now stale.
    ComponentUpdated { entity: EntityId, kind: ComponentKind },
}

/// Fan-out of [`SceneEvent`]s to any number of subscribers.
#[derive(Debug, Default)]
pub struct ReactiveNotifier {
    subscribers: Vec<Sender<SceneEvent>>,
}

impl ReactiveNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new subscription. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<SceneEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, dropping dead ones.
    pub fn emit(&mut self, event: SceneEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_every_subscriber() {
        let mut notifier = ReactiveNotifier::new();
        let rx1 = notifier.subscribe();
        let rx2 = notifier.subscribe();

        let event = SceneEvent::EntityCreated(EntityId::from_raw(1));
        notifier.emit(event.clone());

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }

    #[test]
    fn dropped_receiver_is_pruned() {
        let mut notifier = ReactiveNotifier::new();
        let rx = notifier.subscribe();
        drop(notifier.subscribe());
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.emit(SceneEvent::EntityCreated(EntityId::from_raw(7)));
        assert_eq!(notifier.subscriber_count(), 1);
        assert!(rx.try_recv().is_ok());
    }
}
