// Scripted engine for exercising a facade without real media

use crate::engine::{EngineSignal, EngineSink, MediaEngine};
use crate::error::{PlayerError, Result};
use crate::source::MediaUrl;
use crate::time::MediaTime;
use parking_lot::Mutex;
use std::sync::Arc;

/// A call the facade made on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(MediaUrl),
    Play,
    Pause,
    Seek(MediaTime),
    SetVolume(f32),
    SetRate(f32),
    Shutdown,
}

#[derive(Default)]
struct Script {
    calls: Vec<EngineCall>,
    sink: Option<EngineSink>,
    fail_load: Option<PlayerError>,
    ready_on_load: Option<MediaTime>,
}

/// Engine that records calls and lets the test emit signals
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

/// Test-side handle of a [`ScriptedEngine`], usable after the engine has
/// been moved into a facade
#[derive(Clone)]
pub struct EngineHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineHandle) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            Self {
                script: script.clone(),
            },
            EngineHandle { script },
        )
    }

    /// Report `Ready` from inside `load`
    pub fn ready_on_load(self, duration: MediaTime) -> Self {
        self.script.lock().ready_on_load = Some(duration);
        self
    }

    /// Make `load` return an error
    pub fn failing_load(self, error: PlayerError) -> Self {
        self.script.lock().fail_load = Some(error);
        self
    }

    fn record(&self, call: EngineCall) {
        self.script.lock().calls.push(call);
    }
}

impl EngineHandle {
    /// Emit a signal as if the engine produced it; `false` once the facade is gone
    pub fn emit(&self, signal: EngineSignal) -> bool {
        let sink = self.script.lock().sink.clone();
        match sink {
            Some(sink) => sink.send(signal),
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.script.lock().calls.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.script.lock().sink.is_some()
    }

    pub fn is_shut_down(&self) -> bool {
        self.script
            .lock()
            .calls
            .iter()
            .any(|c| *c == EngineCall::Shutdown)
    }
}

impl MediaEngine for ScriptedEngine {
    fn load(&mut self, url: &MediaUrl, sink: EngineSink) -> Result<()> {
        self.record(EngineCall::Load(url.clone()));
        let mut script = self.script.lock();
        if let Some(error) = script.fail_load.take() {
            return Err(error);
        }
        if let Some(duration) = script.ready_on_load {
            sink.send(EngineSignal::Ready { duration });
        }
        script.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.record(EngineCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(EngineCall::Pause);
        Ok(())
    }

    fn seek(&mut self, position: MediaTime) -> Result<()> {
        self.record(EngineCall::Seek(position));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.record(EngineCall::SetVolume(volume));
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.record(EngineCall::SetRate(rate));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record(EngineCall::Shutdown);
        self.script.lock().sink = None;
    }
}
