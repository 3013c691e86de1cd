//! Repetition timing harness
//!
//! Times are offsets from a single origin taken when the harness starts,
//! so begin/end pairs of different repetitions are directly comparable.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::Result;
use crate::utils::try_with_capacity;

/// One timed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    /// Offset of the start from the harness origin
    pub begin: Duration,
    /// Offset of the end from the harness origin
    pub end: Duration,
}

impl Timespan {
    /// Length of the interval
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.begin)
    }

    /// Length of the interval in seconds
    pub fn seconds(&self) -> f64 {
        self.duration().as_secs_f64()
    }
}

/// Per-repetition timings plus the wall span around all of them
#[derive(Debug, Clone)]
pub struct TimingRecord {
    /// One span per repetition, in execution order
    pub repetitions: Vec<Timespan>,
    /// Span from before the first repetition to after the last
    pub wall: Timespan,
}

impl TimingRecord {
    /// Number of recorded repetitions
    pub fn len(&self) -> usize {
        self.repetitions.len()
    }

    /// Whether no repetition was recorded
    pub fn is_empty(&self) -> bool {
        self.repetitions.is_empty()
    }

    /// Checks that spans are ordered and never overlap
    pub fn is_well_ordered(&self) -> bool {
        let inside_wall = self
            .repetitions
            .iter()
            .all(|s| s.begin <= s.end && s.begin >= self.wall.begin && s.end <= self.wall.end);
        let sequential = self
            .repetitions
            .windows(2)
            .all(|w| w[0].end <= w[1].begin);
        inside_wall && sequential
    }
}

/// Runs `body` `repetitions` times, timing each run and the whole loop
///
/// `begin` is taken immediately before `body` starts and `end` immediately
/// after it returns; `body` must only return once its parallel region has
/// joined.
///
/// # Errors
///
/// Fails with `AllocationFailed` if the span buffer cannot be reserved, in
/// which case `body` is never called.
pub fn time_repetitions<F>(repetitions: usize, mut body: F) -> Result<TimingRecord>
where
    F: FnMut(),
{
    let mut spans = try_with_capacity("timing record", repetitions)?;
    let origin = Instant::now();

    let wall_begin = origin.elapsed();
    for rep in 0..repetitions {
        let begin = origin.elapsed();
        body();
        let end = origin.elapsed();

        spans.push(Timespan { begin, end });
        trace!(rep, seconds = (end - begin).as_secs_f64(), "repetition done");
    }
    let wall_end = origin.elapsed();

    Ok(TimingRecord {
        repetitions: spans,
        wall: Timespan {
            begin: wall_begin,
            end: wall_end,
        },
    })
}
