// Interleaved PCM ring with fill-level watermarks

/// Fixed-capacity ring of interleaved f32 frames.
///
/// Reads and writes move whole frames only, so a reader never sees half of
/// a multi-channel frame.
pub struct PcmRing {
    buffer: Vec<f32>,
    channels: usize,
    capacity_frames: usize,
    read_frame: usize,
    len_frames: usize,
}

impl PcmRing {
    pub fn new(capacity_frames: usize, channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        let capacity_frames = capacity_frames.max(1);
        Self {
            buffer: vec![0.0; capacity_frames * channels],
            channels,
            capacity_frames,
            read_frame: 0,
            len_frames: 0,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn len_frames(&self) -> usize {
        self.len_frames
    }

    pub fn free_frames(&self) -> usize {
        self.capacity_frames - self.len_frames
    }

    pub fn is_empty(&self) -> bool {
        self.len_frames == 0
    }

    pub fn is_full(&self) -> bool {
        self.len_frames == self.capacity_frames
    }

    /// Fill level from 0.0 (empty) to 1.0 (full)
    pub fn fill_level(&self) -> f32 {
        self.len_frames as f32 / self.capacity_frames as f32
    }

    /// Append as many whole frames from `samples` as fit; returns frames written
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let frames = (samples.len() / self.channels).min(self.free_frames());
        if frames == 0 {
            return 0;
        }

        let write_frame = (self.read_frame + self.len_frames) % self.capacity_frames;
        let first = frames.min(self.capacity_frames - write_frame);
        let ch = self.channels;

        // Contiguous part, then the wrapped remainder at the front
        self.buffer[write_frame * ch..(write_frame + first) * ch].copy_from_slice(&samples[..first * ch]);
        if frames > first {
            let rest = frames - first;
            self.buffer[..rest * ch].copy_from_slice(&samples[first * ch..frames * ch]);
        }

        self.len_frames += frames;
        frames
    }

    /// Move up to `output.len() / channels` frames into `output`; returns frames read
    pub fn pop(&mut self, output: &mut [f32]) -> usize {
        let frames = (output.len() / self.channels).min(self.len_frames);
        if frames == 0 {
            return 0;
        }

        let first = frames.min(self.capacity_frames - self.read_frame);
        let ch = self.channels;

        output[..first * ch].copy_from_slice(&self.buffer[self.read_frame * ch..(self.read_frame + first) * ch]);
        if frames > first {
            let rest = frames - first;
            output[first * ch..frames * ch].copy_from_slice(&self.buffer[..rest * ch]);
        }

        self.read_frame = (self.read_frame + frames) % self.capacity_frames;
        self.len_frames -= frames;
        frames
    }

    pub fn clear(&mut self) {
        self.read_frame = 0;
        self.len_frames = 0;
    }
}

/// Change of a watermark flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Full(bool),
    Empty(bool),
}

/// Turns fill levels into full/empty transitions.
///
/// `Full` is raised at or above the high watermark and lowered below the
/// low-resume level; `Empty` is raised at or below the empty watermark and
/// lowered once the level climbs above the refill level. The gaps give
/// hysteresis so a level hovering at a threshold does not flap.
#[derive(Debug, Clone)]
pub struct LevelTracker {
    high: f32,
    high_resume: f32,
    empty: f32,
    refill: f32,
    full_flag: bool,
    empty_flag: bool,
}

impl LevelTracker {
    pub fn new(high: f32, empty: f32) -> Self {
        let high = high.clamp(0.0, 1.0);
        let empty = empty.clamp(0.0, high);
        Self {
            high,
            high_resume: (high - 0.1).max(empty),
            empty,
            refill: (empty + 0.1).min(high),
            full_flag: false,
            empty_flag: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.full_flag
    }

    pub fn is_empty(&self) -> bool {
        self.empty_flag
    }

    /// Feed the current fill level; returns the flags that changed, lowering
    /// before raising so full and empty are never set together
    pub fn update(&mut self, level: f32) -> Vec<LevelChange> {
        let mut changes = Vec::new();

        if self.full_flag && level < self.high_resume {
            self.full_flag = false;
            changes.push(LevelChange::Full(false));
        }
        if self.empty_flag && level > self.refill {
            self.empty_flag = false;
            changes.push(LevelChange::Empty(false));
        }
        if !self.full_flag && level >= self.high {
            self.full_flag = true;
            changes.push(LevelChange::Full(true));
        }
        if !self.empty_flag && level <= self.empty {
            self.empty_flag = true;
            changes.push(LevelChange::Empty(true));
        }

        if !changes.is_empty() {
            log::trace!("Buffer level {:.2}: {:?}", level, changes);
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_wraps_around() {
        let mut ring = PcmRing::new(4, 2);
        assert_eq!(ring.push(&[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]), 3);

        let mut out = [0.0; 4];
        assert_eq!(ring.pop(&mut out), 2);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0]);

        // Writes past the end of the backing store wrap to the front
        assert_eq!(ring.push(&[4.0, 4.0, 5.0, 5.0, 6.0, 6.0]), 3);
        assert!(ring.is_full());

        let mut out = [0.0; 8];
        assert_eq!(ring.pop(&mut out), 4);
        assert_eq!(out, [3.0, 3.0, 4.0, 4.0, 5.0, 5.0, 6.0, 6.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_partial_frames_are_not_written() {
        let mut ring = PcmRing::new(8, 2);
        assert_eq!(ring.push(&[0.5, 0.5, 0.25]), 1);
        assert_eq!(ring.len_frames(), 1);
    }

    #[test]
    fn test_push_respects_capacity() {
        let mut ring = PcmRing::new(2, 1);
        assert_eq!(ring.push(&[0.1, 0.2, 0.3]), 2);
        assert_eq!(ring.push(&[0.4]), 0);
        assert!((ring.fill_level() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_level_tracker_hysteresis() {
        let mut tracker = LevelTracker::new(0.9, 0.0);
        assert_eq!(tracker.update(0.0), vec![LevelChange::Empty(true)]);
        // Still inside the refill band
        assert!(tracker.update(0.05).is_empty());
        assert_eq!(
            tracker.update(0.95),
            vec![LevelChange::Empty(false), LevelChange::Full(true)]
        );
        // Dipping just under the high watermark keeps "full"
        assert!(tracker.update(0.85).is_empty());
        assert_eq!(tracker.update(0.5), vec![LevelChange::Full(false)]);
    }

    #[test]
    fn test_level_tracker_full_to_empty() {
        let mut tracker = LevelTracker::new(0.9, 0.0);
        tracker.update(1.0);
        assert_eq!(
            tracker.update(0.0),
            vec![LevelChange::Full(false), LevelChange::Empty(true)]
        );
        assert!(tracker.is_empty());
        assert!(!tracker.is_full());
    }
}
