// Single-slot, non-owning observer registration

use crate::event::{PlayerEvent, PlayerId};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Player observer trait
/// Implementations should be lightweight and non-blocking
pub trait Observer: Send + Sync {
    /// Called on the facade's dispatch thread, one event at a time, in the
    /// order the engine produced them
    fn on_event(&self, player: PlayerId, event: &PlayerEvent);
}

/// Holds at most one observer without keeping it alive
pub struct ObserverSlot {
    slot: RwLock<Option<Weak<dyn Observer>>>,
}

impl ObserverSlot {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Attach `observer`, replacing any previous one
    pub fn set(&self, observer: Weak<dyn Observer>) {
        let replaced = self.slot.write().replace(observer).is_some();
        if replaced {
            log::debug!("Observer replaced");
        }
    }

    pub fn clear(&self) {
        self.slot.write().take();
    }

    /// Strong handle for the duration of one delivery, if the observer lives
    pub fn get(&self) -> Option<Arc<dyn Observer>> {
        self.slot.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.get().is_some()
    }

    /// Deliver `event`; returns whether an observer received it
    pub fn notify(&self, player: PlayerId, event: &PlayerEvent) -> bool {
        // Upgrade under the lock, call outside it.
        match self.get() {
            Some(observer) => {
                observer.on_event(player, event);
                true
            }
            None => false,
        }
    }
}

impl Default for ObserverSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer that records every event, for tests
#[cfg(any(test, feature = "test-utils"))]
pub struct RecordingObserver {
    events: parking_lot::Mutex<Vec<(PlayerId, PlayerEvent)>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingObserver {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn events_for(&self, player: PlayerId) -> Vec<PlayerEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(id, _)| *id == player)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&PlayerEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|(_, e)| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Poll until `pred` matches some recorded event or `timeout` elapses
    pub fn wait_for(
        &self,
        timeout: std::time::Duration,
        pred: impl Fn(&PlayerEvent) -> bool,
    ) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.count(&pred) > 0 {
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for RecordingObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Observer for RecordingObserver {
    fn on_event(&self, player: PlayerId, event: &PlayerEvent) {
        self.events.lock().push((player, event.clone()));
    }
}
