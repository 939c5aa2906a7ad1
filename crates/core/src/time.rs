// Engine-native media time: a tick count over a timescale

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Timescale used when converting from wall-clock durations and seconds
pub const DEFAULT_TIMESCALE: i32 = 600;

/// A rational point on the media timeline, `value / timescale` seconds.
///
/// A timescale of zero marks an invalid time. A value of `i64::MAX` with a
/// positive timescale marks an indefinite time (unknown duration of a live
/// stream).
#[derive(Clone, Copy, Debug)]
pub struct MediaTime {
    value: i64,
    timescale: i32,
}

impl MediaTime {
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };
    pub const INVALID: Self = Self {
        value: 0,
        timescale: 0,
    };
    pub const POSITIVE_INFINITY: Self = Self {
        value: i64::MAX,
        timescale: 1,
    };

    #[must_use]
    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Whole seconds, exactly representable at timescale 1
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(seconds, 1)
    }

    #[must_use]
    pub fn with_seconds(seconds: f64, timescale: i32) -> Self {
        Self::new((seconds * f64::from(timescale)).round() as i64, timescale)
    }

    #[must_use]
    pub fn with_duration(duration: Duration) -> Self {
        Self::with_seconds(duration.as_secs_f64(), DEFAULT_TIMESCALE)
    }

    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[must_use]
    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    #[must_use]
    pub fn is_indefinite(&self) -> bool {
        self.is_valid() && self.value == i64::MAX
    }

    /// Seconds as a float; zero for invalid times
    #[must_use]
    pub fn seconds(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.value as f64 / f64::from(self.timescale)
    }

    /// Seconds truncated toward zero; zero for invalid times
    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        if !self.is_valid() {
            return 0;
        }
        self.value / i64::from(self.timescale)
    }

    /// Re-express this time in another timescale, rounding to the nearest tick
    #[must_use]
    pub fn convert_scale(&self, timescale: i32) -> Self {
        if !self.is_valid() || timescale <= 0 {
            return Self::INVALID;
        }
        if self.is_indefinite() {
            return Self::new(i64::MAX, timescale);
        }
        let num = i128::from(self.value) * i128::from(timescale);
        let den = i128::from(self.timescale);
        let rounded = (num + num.signum() * den / 2) / den;
        Self::new(rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX - 1)) as i64, timescale)
    }

    /// Clamp into `[lower, upper]`; an indefinite upper bound does not clamp
    #[must_use]
    pub fn clamp_to(self, lower: MediaTime, upper: MediaTime) -> Self {
        if self < lower {
            return lower;
        }
        if upper.is_valid() && !upper.is_indefinite() && self > upper {
            return upper;
        }
        self
    }

    /// Absolute distance between two valid times
    #[must_use]
    pub fn distance(&self, other: &MediaTime) -> Duration {
        if !self.is_valid() || !other.is_valid() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((self.seconds() - other.seconds()).abs())
    }

    #[must_use]
    pub fn to_duration(&self) -> Option<Duration> {
        if !self.is_valid() || self.is_indefinite() || self.value < 0 {
            return None;
        }
        Some(Duration::from_secs_f64(self.seconds()))
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::INVALID
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Invalid sorts before everything, indefinite after every finite time.
impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => return Ordering::Equal,
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            (true, true) => {}
        }
        match (self.is_indefinite(), other.is_indefinite()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let lhs = i128::from(self.value) * i128::from(other.timescale);
        let rhs = i128::from(other.value) * i128::from(self.timescale);
        lhs.cmp(&rhs)
    }
}

impl From<Duration> for MediaTime {
    fn from(d: Duration) -> Self {
        Self::with_duration(d)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "invalid")
        } else if self.is_indefinite() {
            write!(f, "indefinite")
        } else {
            write!(f, "{:.3}s", self.seconds())
        }
    }
}
