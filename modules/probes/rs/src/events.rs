use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use derive_more::Display;

use crate::list::ListId;

/// Change in the tree of probe lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProbeSetEvent {
    #[display("list {_0} added")]
    ListAdded(ListId),
    /// Published before the list is unlinked; carries where the list was in the tree.
    #[display("list {list} removed from {parent} at {position}")]
    ListRemoved {
        list: ListId,
        parent: ListId,
        position: usize,
    },
    #[display("list {_0} renamed")]
    ListRenamed(ListId),
    /// `None` means the root list is active again.
    #[display("active list changed to {_0:?}")]
    ActiveListChanged(Option<ListId>),
}

/// Fan-out of probe set events to any number of subscribers.
///
/// Each subscriber gets its own unbounded channel. Subscribers that dropped their receiver are
/// removed on the next publication.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ProbeSetEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ProbeSetEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    pub fn publish(&self, event: ProbeSetEvent) {
        log::trace!("Publishing probe set event: {event}");
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sender| sender.send(event).is_ok());
    }

    /// Number of live subscribers as of the last publication.
    pub fn subscribers(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_fan_out() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(ProbeSetEvent::ListAdded(ListId::new(1)));
        assert_eq!(first.try_recv(), Ok(ProbeSetEvent::ListAdded(ListId::new(1))));
        assert_eq!(second.try_recv(), Ok(ProbeSetEvent::ListAdded(ListId::new(1))));
        assert!(first.try_recv().is_err());
    }

    #[test]
    fn test_event_display() {
        for (event, expected) in [
            (ProbeSetEvent::ListAdded(ListId::new(2)), "list #2 added"),
            (
                ProbeSetEvent::ListRemoved {
                    list: ListId::new(2),
                    parent: ListId::ROOT,
                    position: 1,
                },
                "list #2 removed from #0 at 1",
            ),
            (ProbeSetEvent::ActiveListChanged(None), "active list changed to None"),
        ] {
            assert_eq!(event.to_string(), expected);
        }
    }

    #[test]
    fn test_event_bus_prunes_dropped_subscribers() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscribers(), 2);

        bus.publish(ProbeSetEvent::ActiveListChanged(None));
        assert_eq!(bus.subscribers(), 1);
        assert_eq!(kept.try_recv(), Ok(ProbeSetEvent::ActiveListChanged(None)));

        bus.clear();
        assert_eq!(bus.subscribers(), 0);
    }
}
