use derive_more::{Add, AddAssign, Sum};

/// This library uses a continuous time model: task parameters may be
/// non-integral, e.g., after scaling execution costs to a slower clock.
pub type Time = f64;

/// Syntactic sugar to give a hint that a time value indicates a
/// point in time or some offset.
pub type Instant = Time;

/// Syntactic sugar to give a hint that a time value denotes an
/// interval length.
pub type Duration = Time;

/// Syntactic sugar to give a hint that a time value represents some
/// amount of processor service.
pub type Service = Time;

/// `⌈t / period⌉`, in agreement with release instants computed as
/// `n * period`: the least `n` with `n * period >= t`, i.e., the number of
/// releases strictly before `t`.
///
/// The quotient alone can be off by one at a release, e.g.,
/// `(7.0 * 9.9) / 9.9` is slightly below 7.
pub fn release_ceil(t: Time, period: Duration) -> Time {
    let n = (t / period).ceil();
    if (n - 1.0) * period >= t {
        n - 1.0
    } else if n * period < t {
        n + 1.0
    } else {
        n
    }
}

/// `⌊t / period⌋`, in agreement with release instants computed as
/// `n * period`: the greatest `n` with `n * period <= t`.
pub fn release_floor(t: Time, period: Duration) -> Time {
    let n = (t / period).floor();
    if n * period > t {
        n - 1.0
    } else if (n + 1.0) * period <= t {
        n + 1.0
    } else {
        n
    }
}

/// Operation counts of a slack computation.
///
/// The counters only serve to compare the computational cost of the
/// different slack strategies; they never influence a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Add, AddAssign, Sum)]
pub struct OpCount {
    /// Number of ceilings taken.
    pub ceilings: u64,
    /// Number of floors taken.
    pub floors: u64,
    /// Number of points at which the slack function was evaluated.
    pub evaluations: u64,
}

impl OpCount {
    /// [release_ceil], counted.
    pub fn ceil(&mut self, t: Time, period: Duration) -> Time {
        self.ceilings += 1;
        release_ceil(t, period)
    }

    /// [release_floor], counted.
    pub fn floor(&mut self, t: Time, period: Duration) -> Time {
        self.floors += 1;
        release_floor(t, period)
    }

    /// The classic cost measure: ceilings plus floors.
    pub fn cc(&self) -> u64 {
        self.ceilings + self.floors
    }
}
