use std::time::{Duration, Instant};

/// Accumulates wall time while a track plays.
///
/// Callers pass `now` explicitly so tests can drive the clock without sleeping.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ElapsedClock {
    offset: Duration,
    running_since: Option<Instant>,
}

impl ElapsedClock {
    pub(crate) fn position(&self, now: Instant) -> Duration {
        let running = self
            .running_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        self.offset + running
    }

    pub(crate) fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub(crate) fn freeze(&mut self, now: Instant) {
        self.offset = self.position(now);
        self.running_since = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Jumps to `position`, keeping the running/frozen mode.
    pub(crate) fn set(&mut self, position: Duration, now: Instant) {
        self.offset = position;
        if self.running_since.is_some() {
            self.running_since = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn accumulates_only_while_running() {
        let origin = Instant::now();
        let mut clock = ElapsedClock::default();
        clock.start(origin);
        assert_eq!(clock.position(origin + 2 * SECOND), 2 * SECOND);

        clock.freeze(origin + 2 * SECOND);
        assert_eq!(clock.position(origin + 10 * SECOND), 2 * SECOND);

        clock.start(origin + 10 * SECOND);
        assert_eq!(clock.position(origin + 11 * SECOND), 3 * SECOND);
    }

    #[test]
    fn seeking_replaces_the_offset() {
        let origin = Instant::now();
        let mut clock = ElapsedClock::default();
        clock.start(origin);
        clock.set(30 * SECOND, origin + 5 * SECOND);
        assert_eq!(clock.position(origin + 6 * SECOND), 31 * SECOND);

        clock.reset();
        assert_eq!(clock.position(origin + 6 * SECOND), Duration::ZERO);
    }
}
