// Facade state machine: turns commands into engine calls and engine
// signals into observer events

use crate::config::PlayerConfig;
use crate::engine::EngineSignal;
use crate::error::{PlayerError, Result};
use crate::event::PlayerEvent;
use crate::time::MediaTime;
use std::time::Duration;

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Loading; duration unknown, commands are queued
    Uninitialized,
    /// Loaded and ready to play
    Ready,
    /// Playing
    Playing,
    /// Paused by the caller
    Paused,
    /// Reached the end of the media
    Ended,
    /// Engine failed; absorbing
    Failed,
}

/// Engine call the facade must make after a state change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    Play,
    Pause,
    Seek(MediaTime),
}

/// Outcome of applying one engine signal
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub events: Vec<PlayerEvent>,
    pub commands: Vec<EngineCommand>,
}

/// The facade's playback state. Not synchronised; the facade wraps it in a
/// lock shared with its dispatch thread.
pub struct StateMachine {
    state: PlayerState,
    duration: MediaTime,
    position: MediaTime,
    pending_play: bool,
    pending_seek: Option<MediaTime>,
    /// Seeks sent to the engine and not yet confirmed by `SeekCompleted`
    seeks_in_flight: u32,
    keeping_up: Option<bool>,
    buffer_full: Option<bool>,
    buffer_empty: Option<bool>,
    last_time_emitted: Option<MediaTime>,
    time_interval: Duration,
    loudness_threshold_db: f32,
}

impl StateMachine {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            state: PlayerState::Uninitialized,
            duration: MediaTime::INVALID,
            position: MediaTime::ZERO,
            pending_play: false,
            pending_seek: None,
            seeks_in_flight: 0,
            keeping_up: None,
            buffer_full: None,
            buffer_empty: None,
            last_time_emitted: None,
            time_interval: config.time_interval,
            loudness_threshold_db: config.loudness_threshold_db,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// `MediaTime::INVALID` until the engine reports readiness
    pub fn duration(&self) -> MediaTime {
        self.duration
    }

    pub fn position(&self) -> MediaTime {
        self.position
    }

    pub fn has_pending_play(&self) -> bool {
        self.pending_play
    }

    pub fn can_transition(from: PlayerState, to: PlayerState) -> bool {
        use PlayerState::*;
        matches!(
            (from, to),
            // From Uninitialized
            (Uninitialized, Ready)
                // From Ready
                | (Ready, Playing)
                | (Ready, Ended)
                // From Playing
                | (Playing, Paused)
                | (Playing, Ended)
                // From Paused
                | (Paused, Playing)
                | (Paused, Ended)
                // From Ended (seek back into the media)
                | (Ended, Paused)
                // Failure is reachable from everywhere but itself
                | (Uninitialized, Failed)
                | (Ready, Failed)
                | (Playing, Failed)
                | (Paused, Failed)
                | (Ended, Failed)
        )
    }

    fn transition(&mut self, to: PlayerState) -> Result<()> {
        if !Self::can_transition(self.state, to) {
            return Err(PlayerError::InvalidState(format!(
                "Invalid state transition from {:?} to {:?}",
                self.state, to
            )));
        }
        log::debug!("Player state changed: {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Caller asked to play
    pub fn request_play(&mut self) -> Vec<EngineCommand> {
        match self.state {
            PlayerState::Uninitialized => {
                log::debug!("play requested before ready, queued");
                self.pending_play = true;
                Vec::new()
            }
            PlayerState::Ready | PlayerState::Paused => match self.transition(PlayerState::Playing) {
                Ok(()) => {
                    self.last_time_emitted = None;
                    vec![EngineCommand::Play]
                }
                Err(e) => {
                    log::warn!("play ignored: {}", e);
                    Vec::new()
                }
            },
            PlayerState::Playing => Vec::new(),
            PlayerState::Ended | PlayerState::Failed => {
                log::warn!("play ignored in state {:?}", self.state);
                Vec::new()
            }
        }
    }

    /// Caller asked to pause
    pub fn request_pause(&mut self) -> Vec<EngineCommand> {
        match self.state {
            PlayerState::Playing => match self.transition(PlayerState::Paused) {
                Ok(()) => vec![EngineCommand::Pause],
                Err(e) => {
                    log::warn!("pause ignored: {}", e);
                    Vec::new()
                }
            },
            PlayerState::Uninitialized => {
                self.pending_play = false;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Caller asked to seek; the target is clamped to `[0, duration]`
    pub fn request_seek(&mut self, target: MediaTime) -> Vec<EngineCommand> {
        if !target.is_valid() {
            log::warn!("seek to invalid time ignored");
            return Vec::new();
        }
        match self.state {
            PlayerState::Failed => {
                log::warn!("seek ignored after failure");
                Vec::new()
            }
            PlayerState::Uninitialized => {
                log::debug!("seek to {} requested before ready, queued", target);
                self.pending_seek = Some(target);
                Vec::new()
            }
            _ => {
                let clamped = target.clamp_to(MediaTime::ZERO, self.duration);
                if clamped != target {
                    log::debug!("seek target {} clamped to {}", target, clamped);
                }
                if self.state == PlayerState::Ended {
                    if let Err(e) = self.transition(PlayerState::Paused) {
                        log::warn!("seek ignored: {}", e);
                        return Vec::new();
                    }
                }
                self.position = clamped;
                self.last_time_emitted = None;
                self.seeks_in_flight += 1;
                vec![EngineCommand::Seek(clamped)]
            }
        }
    }

    /// Apply one engine signal.
    ///
    /// Signals are judged by the state at the time they are applied, not
    /// the state the engine was in when it produced them. Position and
    /// end-of-media reports are dropped while a seek is unconfirmed, since
    /// they describe the timeline before the seek.
    pub fn apply(&mut self, signal: EngineSignal) -> Transition {
        let mut out = Transition::default();

        if self.state == PlayerState::Failed {
            log::debug!("signal {:?} dropped after failure", signal);
            return out;
        }

        match signal {
            EngineSignal::Ready { duration } => {
                if self.state == PlayerState::Uninitialized {
                    self.duration = duration;
                    if let Err(e) = self.transition(PlayerState::Ready) {
                        log::warn!("{}", e);
                        return out;
                    }
                    out.events.push(PlayerEvent::Ready { duration });
                    if let Some(target) = self.pending_seek.take() {
                        out.commands.extend(self.request_seek(target));
                    }
                    if std::mem::take(&mut self.pending_play) {
                        out.commands.extend(self.request_play());
                    }
                } else if duration.is_valid() {
                    self.duration = duration;
                }
            }
            EngineSignal::NotReady => out.events.push(PlayerEvent::NotReady),
            EngineSignal::Failed(error) => {
                if let Err(e) = self.transition(PlayerState::Failed) {
                    log::warn!("{}", e);
                }
                self.pending_play = false;
                self.pending_seek = None;
                out.events.push(PlayerEvent::Failed { error });
            }
            EngineSignal::LikelyToKeepUp(keeping_up) => {
                if self.state != PlayerState::Uninitialized && self.keeping_up != Some(keeping_up) {
                    self.keeping_up = Some(keeping_up);
                    out.events.push(PlayerEvent::PlayWithoutStalling { keeping_up });
                }
            }
            EngineSignal::BufferFull(full) => self.apply_buffer_full(full, &mut out),
            EngineSignal::BufferEmpty(empty) => self.apply_buffer_empty(empty, &mut out),
            EngineSignal::Power { level_db } => {
                if self.is_playing() {
                    out.events.push(PlayerEvent::Loudness {
                        loud: level_db >= self.loudness_threshold_db,
                        power: level_db,
                    });
                }
            }
            EngineSignal::Position(position) => {
                if self.state == PlayerState::Uninitialized || !position.is_valid() {
                    return out;
                }
                if self.seeks_in_flight > 0 {
                    log::debug!("position {} from before the seek dropped", position);
                    return out;
                }
                self.position = position;
                if self.is_playing() && self.time_due(position) {
                    self.last_time_emitted = Some(position);
                    out.events.push(PlayerEvent::Time {
                        seconds: position.whole_seconds(),
                    });
                }
            }
            EngineSignal::SeekCompleted(position) => {
                self.seeks_in_flight = self.seeks_in_flight.saturating_sub(1);
                // Only the latest seek decides where playback is
                if self.seeks_in_flight == 0 && position.is_valid() {
                    self.position = position;
                }
            }
            EngineSignal::PlayedToEnd if self.seeks_in_flight > 0 => {
                log::debug!("end of media from before the seek dropped");
            }
            EngineSignal::PlayedToEnd => match self.state {
                PlayerState::Ready | PlayerState::Playing | PlayerState::Paused => {
                    if let Err(e) = self.transition(PlayerState::Ended) {
                        log::warn!("{}", e);
                        return out;
                    }
                    if self.duration.is_valid() && !self.duration.is_indefinite() {
                        self.position = self.duration;
                    }
                    out.events.push(PlayerEvent::PlayedToEnd);
                }
                _ => log::debug!("end of media ignored in state {:?}", self.state),
            },
        }

        out
    }

    fn time_due(&self, position: MediaTime) -> bool {
        match self.last_time_emitted {
            None => true,
            Some(last) => position.distance(&last) >= self.time_interval,
        }
    }

    // Full and empty are never both set: raising one first lowers the other.
    fn apply_buffer_full(&mut self, full: bool, out: &mut Transition) {
        if self.state == PlayerState::Uninitialized || self.buffer_full == Some(full) {
            return;
        }
        if full && self.buffer_empty == Some(true) {
            self.buffer_empty = Some(false);
            out.events.push(PlayerEvent::BufferEmpty { empty: false });
        }
        self.buffer_full = Some(full);
        out.events.push(PlayerEvent::BufferFull { full });
    }

    fn apply_buffer_empty(&mut self, empty: bool, out: &mut Transition) {
        if self.state == PlayerState::Uninitialized || self.buffer_empty == Some(empty) {
            return;
        }
        if empty && self.buffer_full == Some(true) {
            self.buffer_full = Some(false);
            out.events.push(PlayerEvent::BufferFull { full: false });
        }
        self.buffer_empty = Some(empty);
        out.events.push(PlayerEvent::BufferEmpty { empty });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_machine(duration_secs: i64) -> StateMachine {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(duration_secs),
        });
        sm
    }

    #[test]
    fn test_ready_fires_once() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        assert!(!sm.duration().is_valid());

        let first = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(10),
        });
        assert_eq!(
            first.events,
            vec![PlayerEvent::Ready {
                duration: MediaTime::from_seconds(10)
            }]
        );

        let second = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(12),
        });
        assert!(second.events.is_empty());
        assert_eq!(sm.duration(), MediaTime::from_seconds(12));
        assert_eq!(sm.state(), PlayerState::Ready);
    }

    #[test]
    fn test_failure_is_absorbing() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        let t = sm.apply(EngineSignal::Failed(PlayerError::Load("404".into())));
        assert_eq!(
            t.events,
            vec![PlayerEvent::Failed {
                error: PlayerError::Load("404".into())
            }]
        );
        assert_eq!(sm.state(), PlayerState::Failed);

        let late = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(1),
        });
        assert!(late.events.is_empty());
        assert!(sm.request_play().is_empty());
        assert!(sm.request_seek(MediaTime::ZERO).is_empty());
        assert_eq!(sm.state(), PlayerState::Failed);
    }

    #[test]
    fn test_play_queued_until_ready() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        assert!(sm.request_play().is_empty());
        assert!(sm.has_pending_play());

        let t = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(5),
        });
        assert_eq!(t.commands, vec![EngineCommand::Play]);
        assert_eq!(sm.state(), PlayerState::Playing);
    }

    #[test]
    fn test_pause_cancels_queued_play() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        sm.request_play();
        assert!(sm.request_pause().is_empty());

        let t = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(5),
        });
        assert!(t.commands.is_empty());
        assert_eq!(sm.state(), PlayerState::Ready);
    }

    #[test]
    fn test_play_and_pause_are_idempotent() {
        let mut sm = ready_machine(30);
        assert_eq!(sm.request_play(), vec![EngineCommand::Play]);
        assert!(sm.request_play().is_empty());
        assert_eq!(sm.request_pause(), vec![EngineCommand::Pause]);
        assert!(sm.request_pause().is_empty());
        assert_eq!(sm.state(), PlayerState::Paused);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut sm = ready_machine(30);
        assert_eq!(
            sm.request_seek(MediaTime::from_seconds(45)),
            vec![EngineCommand::Seek(MediaTime::from_seconds(30))]
        );
        assert_eq!(sm.position().whole_seconds(), 30);

        assert_eq!(
            sm.request_seek(MediaTime::from_seconds(-3)),
            vec![EngineCommand::Seek(MediaTime::ZERO)]
        );
        assert!(sm.request_seek(MediaTime::INVALID).is_empty());
    }

    #[test]
    fn test_queued_seek_applied_at_ready() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        sm.request_seek(MediaTime::from_seconds(100));
        let t = sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(60),
        });
        assert_eq!(t.commands, vec![EngineCommand::Seek(MediaTime::from_seconds(60))]);
    }

    #[test]
    fn test_end_then_seek_resumes() {
        let mut sm = ready_machine(10);
        sm.request_play();
        let t = sm.apply(EngineSignal::PlayedToEnd);
        assert_eq!(t.events, vec![PlayerEvent::PlayedToEnd]);
        assert_eq!(sm.state(), PlayerState::Ended);
        assert_eq!(sm.position().whole_seconds(), 10);

        assert!(sm.request_play().is_empty());
        sm.request_seek(MediaTime::from_seconds(2));
        assert_eq!(sm.state(), PlayerState::Paused);
        assert_eq!(sm.request_play(), vec![EngineCommand::Play]);
    }

    #[test]
    fn test_buffer_signals_stay_exclusive() {
        let mut sm = ready_machine(10);
        let a = sm.apply(EngineSignal::BufferEmpty(true));
        assert_eq!(a.events, vec![PlayerEvent::BufferEmpty { empty: true }]);

        let dup = sm.apply(EngineSignal::BufferEmpty(true));
        assert!(dup.events.is_empty());

        let b = sm.apply(EngineSignal::BufferFull(true));
        assert_eq!(
            b.events,
            vec![
                PlayerEvent::BufferEmpty { empty: false },
                PlayerEvent::BufferFull { full: true }
            ]
        );
    }

    #[test]
    fn test_buffer_signals_ignored_before_ready() {
        let mut sm = StateMachine::new(&PlayerConfig::default());
        assert!(sm.apply(EngineSignal::BufferFull(true)).events.is_empty());
        assert!(sm.apply(EngineSignal::LikelyToKeepUp(true)).events.is_empty());
    }

    #[test]
    fn test_time_events_follow_interval() {
        let mut sm = ready_machine(60);
        sm.request_play();

        let mut seconds = Vec::new();
        for tick in 0..=60 {
            let t = sm.apply(EngineSignal::Position(MediaTime::new(tick * 50, 1000)));
            for event in t.events {
                if let PlayerEvent::Time { seconds: s } = event {
                    seconds.push(s);
                }
            }
        }
        assert_eq!(seconds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_positions_from_before_a_seek_are_dropped() {
        let mut sm = ready_machine(30);
        sm.request_play();
        sm.apply(EngineSignal::Position(MediaTime::from_seconds(2)));

        assert_eq!(
            sm.request_seek(MediaTime::from_seconds(20)),
            vec![EngineCommand::Seek(MediaTime::from_seconds(20))]
        );
        // Tick the engine produced before it handled the seek
        let stale = sm.apply(EngineSignal::Position(MediaTime::new(2050, 1000)));
        assert!(stale.events.is_empty());
        assert_eq!(sm.position().whole_seconds(), 20);

        sm.apply(EngineSignal::SeekCompleted(MediaTime::from_seconds(20)));
        let t = sm.apply(EngineSignal::Position(MediaTime::new(20050, 1000)));
        assert_eq!(t.events, vec![PlayerEvent::Time { seconds: 20 }]);
    }

    #[test]
    fn test_only_latest_seek_completion_moves_position() {
        let mut sm = ready_machine(30);
        sm.request_seek(MediaTime::from_seconds(5));
        sm.request_seek(MediaTime::from_seconds(9));

        sm.apply(EngineSignal::SeekCompleted(MediaTime::from_seconds(5)));
        assert_eq!(sm.position().whole_seconds(), 9);
        // End of media reported before the second seek landed
        assert!(sm.apply(EngineSignal::PlayedToEnd).events.is_empty());
        assert_eq!(sm.state(), PlayerState::Ready);

        sm.apply(EngineSignal::SeekCompleted(MediaTime::from_seconds(9)));
        sm.apply(EngineSignal::Position(MediaTime::from_seconds(10)));
        assert_eq!(sm.position().whole_seconds(), 10);
    }

    #[test]
    fn test_no_time_or_loudness_while_paused() {
        let mut sm = ready_machine(60);
        let t = sm.apply(EngineSignal::Position(MediaTime::from_seconds(3)));
        assert!(t.events.is_empty());
        assert_eq!(sm.position().whole_seconds(), 3);
        assert!(sm.apply(EngineSignal::Power { level_db: -3.0 }).events.is_empty());
    }

    #[test]
    fn test_loudness_threshold() {
        let config = PlayerConfig::default().with_loudness_threshold_db(-12.0);
        let mut sm = StateMachine::new(&config);
        sm.apply(EngineSignal::Ready {
            duration: MediaTime::from_seconds(5),
        });
        sm.request_play();

        let loud = sm.apply(EngineSignal::Power { level_db: -6.0 });
        let quiet = sm.apply(EngineSignal::Power { level_db: -30.0 });
        assert_eq!(loud.events, vec![PlayerEvent::Loudness { loud: true, power: -6.0 }]);
        assert_eq!(quiet.events, vec![PlayerEvent::Loudness { loud: false, power: -30.0 }]);
    }

    #[test]
    fn test_transition_table() {
        assert!(StateMachine::can_transition(PlayerState::Paused, PlayerState::Playing));
        assert!(StateMachine::can_transition(PlayerState::Ended, PlayerState::Failed));
        assert!(!StateMachine::can_transition(PlayerState::Failed, PlayerState::Ready));
        assert!(!StateMachine::can_transition(PlayerState::Uninitialized, PlayerState::Playing));
        assert!(!StateMachine::can_transition(PlayerState::Ended, PlayerState::Playing));
    }
}
