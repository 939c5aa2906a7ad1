// Reference engine configuration

use playhead_transport_http::HttpConfig;
use std::time::Duration;

/// Tunables of a [`crate::SymphoniaEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Decoded audio kept ahead of the playhead
    pub buffer_duration: Duration,
    /// Fill level at which the buffer reports full
    pub high_watermark: f32,
    /// Fill level at or below which the buffer reports empty
    pub empty_watermark: f32,
    /// Worker cadence: position, power and buffer reports happen per tick
    pub tick_interval: Duration,
    /// Packets decoded per tick at most, keeps commands responsive
    pub max_packets_per_tick: usize,
    pub http: HttpConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_duration: Duration::from_secs(5),
            high_watermark: 0.9,
            empty_watermark: 0.0,
            tick_interval: Duration::from_millis(50),
            max_packets_per_tick: 64,
            http: HttpConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_buffer_duration(mut self, duration: Duration) -> Self {
        self.buffer_duration = duration;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_watermarks(mut self, high: f32, empty: f32) -> Self {
        self.high_watermark = high;
        self.empty_watermark = empty;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}
