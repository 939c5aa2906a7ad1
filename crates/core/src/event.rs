// Events delivered from a facade to its observer

use crate::error::PlayerError;
use crate::time::MediaTime;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one facade instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn next() -> Self {
        Self(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Player event types
///
/// `Ready` is the one event every observer is expected to handle; the rest
/// may be ignored with a wildcard arm.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Metadata is loaded and the facade accepts playback commands
    Ready { duration: MediaTime },

    /// The engine failed; the facade will not play any more
    Failed { error: PlayerError },

    /// The resource is not (or no longer) ready for playback
    NotReady,

    /// Playback is flowing (`true`) or stalled waiting for data (`false`)
    PlayWithoutStalling { keeping_up: bool },

    /// Engine buffer reached (`true`) or left (`false`) its high watermark
    BufferFull { full: bool },

    /// Engine buffer ran dry (`true`) or refilled (`false`)
    BufferEmpty { empty: bool },

    /// Power meter reading in dBFS
    Loudness { loud: bool, power: f32 },

    /// Periodic playback position in whole seconds
    Time { seconds: i64 },

    /// Playback reached the end of the media
    PlayedToEnd,
}

impl PlayerEvent {
    /// Short label used in logs
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Ready { .. } => "ready",
            PlayerEvent::Failed { .. } => "failed",
            PlayerEvent::NotReady => "not-ready",
            PlayerEvent::PlayWithoutStalling { .. } => "play-without-stalling",
            PlayerEvent::BufferFull { .. } => "buffer-full",
            PlayerEvent::BufferEmpty { .. } => "buffer-empty",
            PlayerEvent::Loudness { .. } => "loudness",
            PlayerEvent::Time { .. } => "time",
            PlayerEvent::PlayedToEnd => "played-to-end",
        }
    }
}
