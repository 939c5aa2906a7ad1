// Headless reference engine built on Symphonia

mod config;
mod decode;
mod demux;
mod engine;
mod meter;
mod worker;

pub use config::EngineConfig;
pub use decode::AudioDecoder;
pub use demux::{Demuxer, TrackInfo};
pub use engine::SymphoniaEngine;
pub use meter::{power_db, MIN_POWER_DB};
pub use playhead_transport_http::HttpConfig;

#[cfg(test)]
pub(crate) mod fixtures;
