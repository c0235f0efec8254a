//! Adaptive poll delay.
//!
//! A device that takes longer to answer than the poll period would
//! otherwise be walked back to back. The [`Pacer`] keeps a short history of
//! cycle durations and stretches the delay in whole minutes while the
//! trailing average exceeds it, then shrinks it again one minute at a time
//! once the device recovers. The configured frequency is the floor.

use std::collections::VecDeque;
use std::time::Duration;

/// Number of cycle durations kept.
pub const WINDOW_CAPACITY: usize = 32;

/// Granularity of delay adjustments.
pub const STEP: Duration = Duration::from_secs(60);

/// Fixed-capacity ring of recent cycle durations.
#[derive(Debug, Clone, Default)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
}

impl LatencyWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Record a duration, overwriting the oldest once full.
    pub fn push(&mut self, elapsed: Duration) {
        if self.samples.len() == WINDOW_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
    }

    /// Mean of the recorded durations, zero when empty.
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Outcome of recording one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Unchanged,
    Raised { from: Duration, to: Duration },
    Lowered { from: Duration, to: Duration },
}

/// Current poll delay plus the history driving it.
#[derive(Debug, Clone)]
pub struct Pacer {
    freq: Duration,
    delay: Duration,
    window: LatencyWindow,
}

impl Pacer {
    pub fn new(freq: Duration) -> Self {
        Self {
            freq,
            delay: freq,
            window: LatencyWindow::new(),
        }
    }

    /// Configured frequency; the delay never drops below it.
    pub fn freq(&self) -> Duration {
        self.freq
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn window(&self) -> &LatencyWindow {
        &self.window
    }

    /// Record one cycle duration and adjust the delay.
    ///
    /// ```
    /// use snmp_poller::poller::{Adjustment, Pacer};
    /// use std::time::Duration;
    ///
    /// let mut pacer = Pacer::new(Duration::from_secs(30));
    /// let adj = pacer.record(Duration::from_secs(75));
    /// assert_eq!(adj, Adjustment::Raised {
    ///     from: Duration::from_secs(30),
    ///     to: Duration::from_secs(120),
    /// });
    /// ```
    pub fn record(&mut self, elapsed: Duration) -> Adjustment {
        self.window.push(elapsed);
        let avg = self.window.average();
        let from = self.delay;

        if avg > self.delay {
            let minutes = avg.as_secs() / STEP.as_secs() + 1;
            self.delay = STEP * minutes as u32;
            return Adjustment::Raised {
                from,
                to: self.delay,
            };
        }
        if avg + STEP < self.delay && self.delay > self.freq {
            self.delay = self.delay.saturating_sub(STEP).max(self.freq);
            return Adjustment::Lowered {
                from,
                to: self.delay,
            };
        }
        Adjustment::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn window_overwrites_oldest() {
        let mut w = LatencyWindow::new();
        assert_eq!(w.average(), Duration::ZERO);
        for _ in 0..WINDOW_CAPACITY {
            w.push(secs(100));
        }
        for _ in 0..WINDOW_CAPACITY {
            w.push(secs(2));
        }
        assert_eq!(w.len(), WINDOW_CAPACITY);
        assert_eq!(w.average(), secs(2));
    }

    #[test]
    fn fast_cycles_leave_delay_alone() {
        let mut p = Pacer::new(secs(60));
        for _ in 0..10 {
            assert_eq!(p.record(secs(1)), Adjustment::Unchanged);
        }
        assert_eq!(p.delay(), secs(60));
    }

    #[test]
    fn raise_to_next_minute_above_average() {
        let mut p = Pacer::new(secs(60));
        // average 61s: next multiple of 60 above it is 120
        assert_eq!(
            p.record(secs(61)),
            Adjustment::Raised {
                from: secs(60),
                to: secs(120)
            }
        );
        // an average of exactly two minutes still rounds up
        let mut p = Pacer::new(secs(60));
        p.record(secs(120));
        assert_eq!(p.delay(), secs(180));
    }

    #[test]
    fn lowers_one_minute_at_a_time_to_floor() {
        let mut p = Pacer::new(secs(120));
        p.record(secs(200));
        assert_eq!(p.delay(), secs(240));

        // flush the slow sample out of the window
        let mut delays = Vec::new();
        for _ in 0..WINDOW_CAPACITY * 2 {
            p.record(Duration::ZERO);
            delays.push(p.delay());
        }
        assert!(delays.windows(2).all(|w| w[0] - w[1] <= STEP));
        assert_eq!(delays[..2], [secs(180), secs(120)]);
        assert_eq!(p.delay(), secs(120));
        assert!(delays.iter().all(|d| *d >= secs(120)));
    }

    #[test]
    fn lowering_stops_one_step_above_average() {
        // a 45s floor is never reached from 60s: that would need a negative average
        let mut p = Pacer::new(secs(45));
        p.record(secs(100));
        for _ in 0..WINDOW_CAPACITY {
            p.record(Duration::ZERO);
        }
        assert_eq!(p.delay(), secs(60));
    }
}
