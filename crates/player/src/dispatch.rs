// Signal dispatcher: applies engine signals and delivers observer events

use crate::facade::Shared;
use playhead_core::{SignalMessage, SignalReceiver};
use std::sync::Arc;

/// Dispatcher thread body. Runs until the facade sends `Shutdown` or is
/// released.
pub(crate) fn run(shared: Arc<Shared>, signals: SignalReceiver) {
    log::debug!("[{}] dispatcher started", shared.id);

    for message in signals.iter() {
        let signal = match message {
            SignalMessage::Signal(signal) => signal,
            SignalMessage::Shutdown => break,
        };
        if shared.is_released() {
            break;
        }

        let events = shared.apply(signal);

        // No lock is held here: observers may call back into the facade
        for event in &events {
            if shared.is_released() {
                log::debug!("[{}] released, dropping {}", shared.id, event.name());
                return;
            }
            log::debug!("[{}] event {}", shared.id, event.name());
            if !shared.observer.notify(shared.id, event) {
                log::trace!("[{}] no observer for {}", shared.id, event.name());
            }
        }
    }

    log::debug!("[{}] dispatcher exited", shared.id);
}
