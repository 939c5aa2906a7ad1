// Symphonia-backed MediaEngine

use crate::config::EngineConfig;
use crate::worker::{self, Command};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use playhead_core::{EngineSink, MediaEngine, MediaTime, MediaUrl, PlayerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long shutdown waits for the worker before leaving it to finish alone
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Headless engine: decodes on a worker thread and paces playback against
/// the wall clock, reporting what a device would have played
pub struct SymphoniaEngine {
    config: EngineConfig,
    commands: Option<Sender<Command>>,
    worker_thread: Option<thread::JoinHandle<()>>,
    /// Disconnects when the worker returns
    exited: Option<Receiver<()>>,
    /// Aborts network I/O of the current load
    cancel: Arc<AtomicBool>,
    volume: f32,
    rate: f32,
}

impl SymphoniaEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            commands: None,
            worker_thread: None,
            exited: None,
            cancel: Arc::new(AtomicBool::new(false)),
            volume: 1.0,
            rate: 1.0,
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| PlayerError::InvalidState("Engine not loaded".to_string()))?;
        commands
            .send(command)
            .map_err(|_| PlayerError::Engine("Engine worker has stopped".to_string()))
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MediaEngine for SymphoniaEngine {
    fn load(&mut self, url: &MediaUrl, sink: EngineSink) -> Result<()> {
        if self.worker_thread.is_some() {
            return Err(PlayerError::InvalidState("Engine already loaded".to_string()));
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let (exit_tx, exit_rx) = crossbeam_channel::bounded::<()>(0);
        let url = url.clone();
        let config = self.config.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let (volume, rate) = (self.volume, self.rate);

        let handle = thread::Builder::new()
            .name("playhead-engine".to_string())
            .spawn(move || {
                let _exit = exit_tx;
                worker::run(url, sink, rx, config, worker_cancel, volume, rate)
            })
            .map_err(|e| PlayerError::Engine(format!("Failed to spawn engine worker: {}", e)))?;

        self.commands = Some(tx);
        self.worker_thread = Some(handle);
        self.exited = Some(exit_rx);
        self.cancel = cancel;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.send(Command::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(Command::Pause)
    }

    fn seek(&mut self, position: MediaTime) -> Result<()> {
        self.send(Command::Seek(position))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = volume;
        match self.commands {
            Some(_) => self.send(Command::Volume(volume)),
            None => Ok(()),
        }
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.rate = rate;
        match self.commands {
            Some(_) => self.send(Command::Rate(rate)),
            None => Ok(()),
        }
    }

    /// Stop the worker. A worker blocked in a network request cannot see
    /// the shutdown command; after [`SHUTDOWN_GRACE`] it is detached and
    /// exits on its own once the request returns, without sending anything.
    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        let Some(handle) = self.worker_thread.take() else {
            return;
        };

        if let Some(exited) = self.exited.take() {
            if let Err(RecvTimeoutError::Timeout) = exited.recv_timeout(SHUTDOWN_GRACE) {
                log::warn!("[engine] worker blocked on I/O, detaching it");
                return;
            }
        }
        if handle.join().is_err() {
            log::error!("[engine] worker panicked");
        }
    }
}

impl Drop for SymphoniaEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
