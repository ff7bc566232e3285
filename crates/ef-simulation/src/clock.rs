/// Tracks simulation time: a monotonic tick counter and a millisecond
/// clock that every time-dependent rule reads as `now`.
///
/// The clock never consults the wall clock. Hosts feed it real elapsed time
/// through [`SimClock::advance_by`]; tests feed it whatever they like.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    start_ms: u64,
    now_ms: u64,
    tick_ms: u64,
}

impl SimClock {
    /// Create a new clock at tick 0, reading `start_ms`, with a default
    /// tick length of `tick_ms`.
    pub fn new(start_ms: u64, tick_ms: u64) -> Self {
        Self {
            tick: 0,
            start_ms,
            now_ms: start_ms,
            tick_ms,
        }
    }

    /// Advance by one default-length tick. Returns the new tick number.
    pub fn advance(&mut self) -> u64 {
        self.advance_by(self.tick_ms)
    }

    /// Advance by `delta_ms`. Returns the new tick number.
    pub fn advance_by(&mut self, delta_ms: u64) -> u64 {
        self.tick += 1;
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        self.tick
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulation time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Milliseconds elapsed since the clock started.
    pub fn elapsed_ms(&self) -> u64 {
        self.now_ms - self.start_ms
    }

    /// Return the configured default tick length.
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new(1_000, 50);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.now(), 1_000);
        assert_eq!(clock.elapsed_ms(), 0);
    }

    #[test]
    fn clock_advance_uses_tick_length() {
        let mut clock = SimClock::new(0, 50);
        clock.advance();
        clock.advance();
        clock.advance();
        assert_eq!(clock.tick(), 3);
        assert_eq!(clock.now(), 150);
    }

    #[test]
    fn clock_advance_by_variable_delta() {
        let mut clock = SimClock::new(500, 50);
        assert_eq!(clock.advance_by(16), 1);
        assert_eq!(clock.advance_by(34), 2);
        assert_eq!(clock.now(), 550);
        assert_eq!(clock.elapsed_ms(), 50);
    }

    #[test]
    fn zero_delta_still_counts_a_tick() {
        let mut clock = SimClock::new(0, 50);
        clock.advance_by(0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.now(), 0);
    }
}
