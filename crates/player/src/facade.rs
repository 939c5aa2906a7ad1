// PlayerFacade and its builder

use crate::dispatch;
use crate::logging::init_logging;
use parking_lot::Mutex;
use playhead_core::{
    signal_channel, EngineCommand, EngineSignal, EngineSink, MediaEngine, MediaTime, MediaUrl,
    Observer, ObserverSlot, PlayerConfig, PlayerEvent, PlayerId, PlayerState, Result, StateMachine,
};
use playhead_engine::{EngineConfig, SymphoniaEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

struct Inner {
    machine: StateMachine,
    /// Taken out on release so shutdown runs without the lock
    engine: Option<Box<dyn MediaEngine>>,
    volume: f32,
    rate: f32,
}

/// State shared between a facade and its dispatcher thread
pub(crate) struct Shared {
    pub(crate) id: PlayerId,
    inner: Mutex<Inner>,
    pub(crate) observer: ObserverSlot,
    sink: EngineSink,
    released: AtomicBool,
}

impl Shared {
    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Apply one engine signal and run the engine calls it implies;
    /// returns the events to deliver
    pub(crate) fn apply(&self, signal: EngineSignal) -> Vec<PlayerEvent> {
        log::debug!("[{}] signal {:?}", self.id, signal);
        let mut inner = self.inner.lock();
        let transition = inner.machine.apply(signal);
        if let Err(e) = execute(inner.engine.as_mut(), transition.commands) {
            log::error!("[{}] engine rejected queued command: {}", self.id, e);
            self.sink.fail(e);
        }
        transition.events
    }
}

fn execute(engine: Option<&mut Box<dyn MediaEngine>>, commands: Vec<EngineCommand>) -> Result<()> {
    let Some(engine) = engine else {
        return Ok(());
    };
    for command in commands {
        match command {
            EngineCommand::Play => engine.play()?,
            EngineCommand::Pause => engine.pause()?,
            EngineCommand::Seek(position) => engine.seek(position)?,
        }
    }
    Ok(())
}

/// Builder for [`PlayerFacade`]
pub struct PlayerBuilder {
    url: String,
    observer: Option<Weak<dyn Observer>>,
    config: PlayerConfig,
    engine: Option<Box<dyn MediaEngine>>,
    engine_config: EngineConfig,
}

impl PlayerBuilder {
    /// Observer attached before loading starts, so it sees every event.
    /// Only a weak reference is kept.
    pub fn observer<O: Observer + 'static>(mut self, observer: &Arc<O>) -> Self {
        let weak: Weak<O> = Arc::downgrade(observer);
        let weak: Weak<dyn Observer> = weak;
        self.observer = Some(weak);
        self
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `engine` instead of the default [`SymphoniaEngine`]
    pub fn engine(mut self, engine: Box<dyn MediaEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Configuration for the default engine; ignored when an engine is given
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Bind the facade and start loading. Never fails: a bad URL or an
    /// engine that refuses to load is reported as `Failed`.
    pub fn build(self) -> PlayerFacade {
        init_logging();

        let id = PlayerId::next();
        let (sink, signals) = signal_channel();
        let mut engine: Box<dyn MediaEngine> = match self.engine {
            Some(engine) => engine,
            None => Box::new(SymphoniaEngine::new(self.engine_config)),
        };

        let observer = ObserverSlot::new();
        if let Some(weak) = self.observer {
            observer.set(weak);
        }

        log::info!("[{}] created for {}", id, self.url);
        let loaded = MediaUrl::parse(&self.url).and_then(|url| {
            engine.set_volume(self.config.initial_volume)?;
            engine.set_rate(self.config.initial_rate)?;
            engine.load(&url, sink.clone())
        });
        if let Err(e) = loaded {
            log::error!("[{}] failed to load {}: {}", id, self.url, e);
            sink.fail(e);
        }

        let shared = Arc::new(Shared {
            id,
            inner: Mutex::new(Inner {
                machine: StateMachine::new(&self.config),
                engine: Some(engine),
                volume: self.config.initial_volume,
                rate: self.config.initial_rate,
            }),
            observer,
            sink,
            released: AtomicBool::new(false),
        });

        let dispatcher = {
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("playhead-dispatch-{}", id.as_u64()))
                .spawn(move || dispatch::run(shared, signals))
        };
        let dispatcher = match dispatcher {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("[{}] failed to spawn dispatcher: {}", id, e);
                None
            }
        };

        PlayerFacade {
            shared,
            url: self.url,
            dispatcher,
        }
    }
}

/// One playback session bound to one media URL.
///
/// Commands return immediately; their outcome, and everything the engine
/// reports, reaches the observer as [`PlayerEvent`]s on a dedicated
/// dispatcher thread. The facade keeps the observer only weakly.
pub struct PlayerFacade {
    shared: Arc<Shared>,
    url: String,
    dispatcher: Option<thread::JoinHandle<()>>,
}

impl PlayerFacade {
    /// Facade with the default engine and configuration and no observer
    pub fn new(url: impl Into<String>) -> Self {
        Self::builder(url).build()
    }

    pub fn builder(url: impl Into<String>) -> PlayerBuilder {
        PlayerBuilder {
            url: url.into(),
            observer: None,
            config: PlayerConfig::default(),
            engine: None,
            engine_config: EngineConfig::default(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.shared.id
    }

    /// The URL this facade was created with
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Attach `observer`, replacing the current one. It only sees events
    /// dispatched from now on.
    pub fn set_observer<O: Observer + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(observer);
        let weak: Weak<dyn Observer> = weak;
        self.shared.observer.set(weak);
    }

    pub fn clear_observer(&self) {
        self.shared.observer.clear();
    }

    pub fn has_observer(&self) -> bool {
        self.shared.observer.is_attached()
    }

    /// Start or resume playback; queued until the media is ready.
    /// Time and loudness reports are filtered by the state in force when
    /// the dispatcher applies them, not when the engine produced them.
    pub fn play(&self) {
        self.command("play", StateMachine::request_play);
    }

    /// Pause playback; before the media is ready this cancels a queued play
    pub fn pause(&self) {
        self.command("pause", StateMachine::request_pause);
    }

    pub fn seek_to_seconds(&self, seconds: i64) {
        self.seek_to_time(MediaTime::from_seconds(seconds));
    }

    /// Seek to `time`, clamped to `[0, duration]`. An invalid time is ignored.
    pub fn seek_to_time(&self, time: MediaTime) {
        self.command("seek", |machine| machine.request_seek(time));
    }

    pub fn set_volume(&self, volume: f32) {
        let mut inner = self.shared.inner.lock();
        if inner.machine.state() == PlayerState::Failed {
            log::warn!("[{}] set_volume ignored after failure", self.shared.id);
            return;
        }
        inner.volume = volume;
        if let Some(engine) = inner.engine.as_mut() {
            if let Err(e) = engine.set_volume(volume) {
                log::error!("[{}] set_volume failed: {}", self.shared.id, e);
                self.shared.sink.fail(e);
            }
        }
    }

    pub fn set_rate(&self, rate: f32) {
        let mut inner = self.shared.inner.lock();
        if inner.machine.state() == PlayerState::Failed {
            log::warn!("[{}] set_rate ignored after failure", self.shared.id);
            return;
        }
        inner.rate = rate;
        if let Some(engine) = inner.engine.as_mut() {
            if let Err(e) = engine.set_rate(rate) {
                log::error!("[{}] set_rate failed: {}", self.shared.id, e);
                self.shared.sink.fail(e);
            }
        }
    }

    pub fn is_played(&self) -> bool {
        self.shared.inner.lock().machine.is_playing()
    }

    /// Playback position in whole seconds, truncated
    pub fn current_time(&self) -> i64 {
        self.current_media_time().whole_seconds()
    }

    pub fn current_media_time(&self) -> MediaTime {
        self.shared.inner.lock().machine.position()
    }

    /// `MediaTime::INVALID` until `Ready`
    pub fn duration(&self) -> MediaTime {
        self.shared.inner.lock().machine.duration()
    }

    pub fn volume(&self) -> f32 {
        self.shared.inner.lock().volume
    }

    pub fn rate(&self) -> f32 {
        self.shared.inner.lock().rate
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().machine.state()
    }

    fn command(&self, name: &str, request: impl FnOnce(&mut StateMachine) -> Vec<EngineCommand>) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        let commands = request(&mut inner.machine);
        log::debug!("[{}] {} -> {:?}", self.shared.id, name, commands);
        if let Err(e) = execute(inner.engine.as_mut(), commands) {
            log::error!("[{}] {} failed: {}", self.shared.id, name, e);
            self.shared.sink.fail(e);
        }
    }
}

impl Drop for PlayerFacade {
    fn drop(&mut self) {
        log::info!("[{}] releasing", self.shared.id);
        self.shared.released.store(true, Ordering::Release);
        self.shared.observer.clear();
        let engine = self.shared.inner.lock().engine.take();
        if let Some(mut engine) = engine {
            engine.shutdown();
        }
        self.shared.sink.shutdown();

        if let Some(handle) = self.dispatcher.take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from an observer callback; the dispatcher exits
                // once that callback returns
                log::debug!("[{}] released from its dispatcher", self.shared.id);
            } else if handle.join().is_err() {
                log::error!("[{}] dispatcher panicked", self.shared.id);
            }
        }
    }
}
