// Engine worker thread: load, buffer, pace, meter, report

use crate::config::EngineConfig;
use crate::decode::AudioDecoder;
use crate::demux::{Demuxer, TrackInfo};
use crate::meter::power_db;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use playhead_core::{EngineSignal, EngineSink, MediaTime, MediaUrl, Result};
use playhead_ringbuffer::{LevelChange, LevelTracker, PcmRing};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Commands from the engine handle to its worker
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Command {
    Play,
    Pause,
    Seek(MediaTime),
    Volume(f32),
    Rate(f32),
    Shutdown,
}

/// Worker entry point. A load or playback error seen after `cancel` is set
/// is not reported.
pub(crate) fn run(
    url: MediaUrl,
    sink: EngineSink,
    commands: Receiver<Command>,
    config: EngineConfig,
    cancel: Arc<AtomicBool>,
    volume: f32,
    rate: f32,
) {
    let cancelled = || cancel.load(Ordering::Acquire);

    log::info!("[engine] loading {}", url);
    if !sink.send(EngineSignal::NotReady) {
        return;
    }

    let mut session = match Session::open(&url, &config, cancel.clone(), volume, rate) {
        _ if cancelled() => {
            log::debug!("[engine] load of {} cancelled", url);
            return;
        }
        Ok(session) => session,
        Err(e) => {
            log::error!("[engine] failed to load {}: {}", url, e);
            sink.fail(e);
            return;
        }
    };

    log::info!(
        "[engine] track sample_rate={} channels={} duration={}",
        session.track.sample_rate,
        session.track.channels,
        session.track.duration
    );
    if !sink.send(EngineSignal::Ready {
        duration: session.track.duration,
    }) {
        return;
    }
    // Nothing is buffered yet
    session.keeping_up = Some(false);
    if !sink.send(EngineSignal::LikelyToKeepUp(false)) {
        return;
    }

    match session.run(&sink, &commands, &config) {
        Err(e) if !cancelled() => {
            log::error!("[engine] playback error: {}", e);
            sink.fail(e);
        }
        _ => {}
    }
    log::info!("[engine] worker exited");
}

struct Session {
    demuxer: Demuxer,
    decoder: AudioDecoder,
    track: TrackInfo,
    ring: PcmRing,
    levels: LevelTracker,
    /// Decoded samples that did not fit into the ring yet
    spill: Vec<f32>,
    spill_pos: usize,
    /// Frames to drop after an accurate seek
    skip_frames: u64,
    scratch: Vec<f32>,
    position_frames: u64,
    pending_frames: f64,
    last_tick: Instant,
    playing: bool,
    end_of_stream: bool,
    ended: bool,
    keeping_up: Option<bool>,
    volume: f32,
    rate: f32,
}

impl Session {
    fn open(url: &MediaUrl, config: &EngineConfig, cancel: Arc<AtomicBool>, volume: f32, rate: f32) -> Result<Self> {
        let demuxer = Demuxer::open_cancellable(url, config, cancel)?;
        let track = demuxer.track_info()?;
        let decoder = AudioDecoder::from_demuxer(&demuxer)?;

        let capacity = (config.buffer_duration.as_secs_f64() * f64::from(track.sample_rate)).ceil() as usize;
        let ring = PcmRing::new(capacity, track.channels);

        Ok(Self {
            demuxer,
            decoder,
            ring,
            levels: LevelTracker::new(config.high_watermark, config.empty_watermark),
            spill: Vec::new(),
            spill_pos: 0,
            skip_frames: 0,
            scratch: Vec::new(),
            position_frames: 0,
            pending_frames: 0.0,
            last_tick: Instant::now(),
            playing: false,
            end_of_stream: false,
            ended: false,
            keeping_up: None,
            volume,
            rate,
            track,
        })
    }

    fn run(&mut self, sink: &EngineSink, commands: &Receiver<Command>, config: &EngineConfig) -> Result<()> {
        let mut primed = false;

        loop {
            match commands.recv_timeout(config.tick_interval) {
                Ok(command) => {
                    if !self.handle(command, sink)? {
                        return Ok(());
                    }
                    // Apply everything queued before doing more work
                    while let Ok(command) = commands.try_recv() {
                        if !self.handle(command, sink)? {
                            return Ok(());
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }

            self.fill(config.max_packets_per_tick)?;

            let mut signals = Vec::new();
            if !self.playing && (self.ring.len_frames() > 0 || self.end_of_stream) {
                self.set_keeping_up(true, &mut signals);
            }
            if self.playing {
                self.advance(&mut signals);
            }

            // Levels are meaningless until the first decode pass ran
            if primed || self.ring.len_frames() > 0 || self.end_of_stream {
                primed = true;
                for change in self.levels.update(self.ring.fill_level()) {
                    signals.push(match change {
                        LevelChange::Full(full) => EngineSignal::BufferFull(full),
                        LevelChange::Empty(empty) => EngineSignal::BufferEmpty(empty),
                    });
                }
            }

            for signal in signals {
                if !sink.send(signal) {
                    log::debug!("[engine] facade gone, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Returns `false` when the worker should stop
    fn handle(&mut self, command: Command, sink: &EngineSink) -> Result<bool> {
        log::debug!("[engine] command {:?}", command);
        match command {
            Command::Play => {
                if !self.ended {
                    self.playing = true;
                    self.last_tick = Instant::now();
                }
            }
            Command::Pause => self.playing = false,
            Command::Seek(target) => {
                let reached = self.seek(target)?;
                return Ok(sink.send(EngineSignal::SeekCompleted(reached)));
            }
            Command::Volume(volume) => self.volume = volume,
            Command::Rate(rate) => {
                // Frames due at the old rate are played before switching
                if self.playing {
                    let mut signals = Vec::new();
                    self.advance(&mut signals);
                    for signal in signals {
                        if !sink.send(signal) {
                            return Ok(false);
                        }
                    }
                }
                self.rate = rate;
            }
            Command::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    fn seek(&mut self, target: MediaTime) -> Result<MediaTime> {
        let sample_rate = self.track.sample_rate;
        let target = target.clamp_to(MediaTime::ZERO, self.track.duration);

        self.ring.clear();
        self.spill.clear();
        self.spill_pos = 0;
        self.pending_frames = 0.0;
        self.ended = false;
        self.last_tick = Instant::now();

        let at_end = !self.track.duration.is_indefinite() && target >= self.track.duration;
        if at_end {
            self.end_of_stream = true;
            self.skip_frames = 0;
        } else {
            match self.demuxer.seek(target, sample_rate) {
                Ok(skip) => {
                    self.decoder.reset();
                    self.end_of_stream = false;
                    self.skip_frames = skip;
                }
                Err(e) => {
                    log::warn!("[engine] {}; keeping position", e);
                    return Ok(self.position());
                }
            }
        }

        self.position_frames = target.convert_scale(sample_rate as i32).value().max(0) as u64;
        log::info!("[engine] seek to {}", self.position());
        Ok(self.position())
    }

    fn position(&self) -> MediaTime {
        MediaTime::new(self.position_frames as i64, self.track.sample_rate as i32)
    }

    /// Decode until the ring reaches its high watermark or the budget runs out
    fn fill(&mut self, max_packets: usize) -> Result<()> {
        let channels = self.track.channels.max(1) as usize;
        let target = self.ring.capacity_frames();

        for _ in 0..max_packets {
            self.drain_spill();
            if self.spill_pos < self.spill.len() || self.ring.len_frames() >= target || self.end_of_stream {
                return Ok(());
            }

            let packet = match self.demuxer.next_packet()? {
                Some(packet) => packet,
                None => {
                    log::debug!("[engine] end of stream");
                    self.end_of_stream = true;
                    return Ok(());
                }
            };

            let Some(pcm) = self.decoder.decode(&packet)? else {
                continue;
            };

            let skip = (self.skip_frames as usize).min(pcm.len() / channels);
            self.skip_frames -= skip as u64;
            self.spill.clear();
            self.spill.extend_from_slice(&pcm[skip * channels..]);
            self.spill_pos = 0;
        }
        Ok(())
    }

    fn drain_spill(&mut self) {
        if self.spill_pos < self.spill.len() {
            let channels = self.track.channels.max(1) as usize;
            let written = self.ring.push(&self.spill[self.spill_pos..]);
            self.spill_pos += written * channels;
        }
    }

    /// Consume the frames due since the last tick and report what was played
    fn advance(&mut self, signals: &mut Vec<EngineSignal>) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        if self.rate > 0.0 {
            self.pending_frames += elapsed * f64::from(self.track.sample_rate) * f64::from(self.rate);
        }
        let due = self.pending_frames.floor() as usize;
        if due == 0 {
            return;
        }

        let channels = self.track.channels.max(1) as usize;
        self.scratch.resize(due * channels, 0.0);
        let played = self.ring.pop(&mut self.scratch);
        self.pending_frames -= played as f64;
        self.position_frames += played as u64;

        if played > 0 {
            signals.push(EngineSignal::Power {
                level_db: power_db(&self.scratch[..played * channels], self.volume),
            });
            signals.push(EngineSignal::Position(self.position()));
        }

        if played < due {
            if self.end_of_stream && self.ring.is_empty() && self.spill_pos >= self.spill.len() {
                log::info!("[engine] played to end at {}", self.position());
                self.playing = false;
                self.ended = true;
                self.pending_frames = 0.0;
                signals.push(EngineSignal::PlayedToEnd);
                return;
            }
            // Starved: drop the backlog rather than racing to catch up later
            self.pending_frames = 0.0;
            self.set_keeping_up(false, signals);
        } else {
            self.set_keeping_up(true, signals);
        }
    }

    fn set_keeping_up(&mut self, keeping_up: bool, signals: &mut Vec<EngineSignal>) {
        if self.keeping_up != Some(keeping_up) {
            if !keeping_up {
                log::warn!("[engine] playback stalled at {}", self.position());
            }
            self.keeping_up = Some(keeping_up);
            signals.push(EngineSignal::LikelyToKeepUp(keeping_up));
        }
    }
}
