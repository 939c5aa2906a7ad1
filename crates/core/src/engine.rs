// Media engine seam: commands go in, signals come out

use crate::error::{PlayerError, Result};
use crate::source::MediaUrl;
use crate::time::MediaTime;
use crossbeam_channel::{Receiver, Sender};

/// Report from an engine to the facade that owns it
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// Metadata loaded; `duration` may be indefinite for live streams
    Ready { duration: MediaTime },
    /// Resource not (or no longer) playable
    NotReady,
    /// Unrecoverable engine failure
    Failed(PlayerError),
    /// Buffered data is (or is not) sufficient to play without stalling
    LikelyToKeepUp(bool),
    /// Buffer crossed its high watermark
    BufferFull(bool),
    /// Buffer ran dry or refilled
    BufferEmpty(bool),
    /// Power meter reading of the audio just played
    Power { level_db: f32 },
    /// Current playback position
    Position(MediaTime),
    /// A seek finished at the given position
    SeekCompleted(MediaTime),
    /// End of media reached while playing
    PlayedToEnd,
}

/// Messages on a facade's signal channel
#[derive(Debug)]
pub enum SignalMessage {
    Signal(EngineSignal),
    Shutdown,
}

pub type SignalReceiver = Receiver<SignalMessage>;

/// Create the channel a facade listens on and the sink its engine reports to
pub fn signal_channel() -> (EngineSink, SignalReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EngineSink { tx }, rx)
}

/// Sending half handed to an engine at load time
#[derive(Debug, Clone)]
pub struct EngineSink {
    tx: Sender<SignalMessage>,
}

impl EngineSink {
    /// Report a signal; `false` means the facade is gone and the engine
    /// should wind down
    pub fn send(&self, signal: EngineSignal) -> bool {
        self.tx.send(SignalMessage::Signal(signal)).is_ok()
    }

    pub fn fail(&self, error: PlayerError) -> bool {
        self.send(EngineSignal::Failed(error))
    }

    /// Ask the dispatcher listening on this channel to exit
    pub fn shutdown(&self) {
        let _ = self.tx.send(SignalMessage::Shutdown);
    }
}

/// Core media engine trait
///
/// Every method must return promptly; loading, decoding and buffering happen
/// on engine-owned threads and are reported through the sink given to
/// [`MediaEngine::load`]. An `Err` from any method is surfaced to the
/// observer as a failure.
pub trait MediaEngine: Send {
    /// Start loading `url`; readiness or failure arrives through `sink`
    fn load(&mut self, url: &MediaUrl, sink: EngineSink) -> Result<()>;

    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self) -> Result<()>;

    /// Move the playback position. Every call must be answered with one
    /// `SeekCompleted`; positions are ignored until it arrives.
    fn seek(&mut self, position: MediaTime) -> Result<()>;

    /// Set output volume (1.0 = unity gain)
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Set playback rate (1.0 = normal speed)
    fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Stop all engine threads; no signal is sent afterwards
    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_reports_closed_channel() {
        let (sink, rx) = signal_channel();
        assert!(sink.send(EngineSignal::NotReady));
        assert!(matches!(
            rx.recv(),
            Ok(SignalMessage::Signal(EngineSignal::NotReady))
        ));

        drop(rx);
        assert!(!sink.send(EngineSignal::PlayedToEnd));
    }
}
