// Player facade: one media URL, one engine, one observer

mod dispatch;
mod facade;
mod logging;

pub use facade::{PlayerBuilder, PlayerFacade};
pub use logging::init_logging;

pub use playhead_core::{
    MediaEngine, MediaTime, MediaUrl, Observer, PlayerConfig, PlayerError, PlayerEvent, PlayerId,
    PlayerState,
};
pub use playhead_engine::{EngineConfig, SymphoniaEngine};
