// Core types and traits for the playhead player facade

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod observer;
pub mod source;
pub mod state;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export commonly used types
pub use config::PlayerConfig;
pub use engine::{
    signal_channel, EngineSignal, EngineSink, MediaEngine, SignalMessage, SignalReceiver,
};
pub use error::{PlayerError, Result};
pub use event::{PlayerEvent, PlayerId};
pub use observer::{Observer, ObserverSlot};
pub use source::MediaUrl;
pub use state::{EngineCommand, PlayerState, StateMachine, Transition};
pub use time::MediaTime;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{EngineCall, EngineHandle, ScriptedEngine};
#[cfg(any(test, feature = "test-utils"))]
pub use observer::RecordingObserver;
