// Facade configuration

use std::time::Duration;

/// Media-time distance between two periodic time events
pub const DEFAULT_TIME_INTERVAL: Duration = Duration::from_secs(1);

/// Power level (dBFS) at or above which a meter reading counts as loud
pub const DEFAULT_LOUDNESS_THRESHOLD_DB: f32 = -20.0;

/// Tunables of one facade, fixed at construction
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Cadence of `PlayerEvent::Time` while playing
    pub time_interval: Duration,
    /// Threshold for the `loud` flag of `PlayerEvent::Loudness`
    pub loudness_threshold_db: f32,
    /// Volume applied before loading
    pub initial_volume: f32,
    /// Rate applied before loading
    pub initial_rate: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            time_interval: DEFAULT_TIME_INTERVAL,
            loudness_threshold_db: DEFAULT_LOUDNESS_THRESHOLD_DB,
            initial_volume: 1.0,
            initial_rate: 1.0,
        }
    }
}

impl PlayerConfig {
    pub fn with_time_interval(mut self, interval: Duration) -> Self {
        self.time_interval = interval;
        self
    }

    pub fn with_loudness_threshold_db(mut self, threshold: f32) -> Self {
        self.loudness_threshold_db = threshold;
        self
    }

    pub fn with_initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_initial_rate(mut self, rate: f32) -> Self {
        self.initial_rate = rate;
        self
    }
}
