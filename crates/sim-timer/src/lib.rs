//! The fixed-period, rescalable callback scheduler (§4.E). Drives both
//! the server's tick loop and the client's tick loop; `start`/`stop` are
//! idempotent, `set_scale` changes the effective interval for
//! subsequent invocations.
//!
//! Missed-period policy (§9 Open Question, resolved in SPEC_FULL.md):
//! this Timer *coalesces*. If the host stalls past one or more periods,
//! the next `poll` fires the callback once and resets the schedule from
//! the current time rather than invoking once per owed period.

use std::time::Duration;

use base::system::SystemTimeInterface;

#[derive(Debug)]
pub struct Timer {
    base_period: Duration,
    scale: f64,
    running: bool,
    next_due: Duration,
}

impl Timer {
    pub fn new(period: Duration) -> Self {
        Self { base_period: period, scale: 1.0, running: false, next_due: Duration::ZERO }
    }

    fn effective_period(&self) -> Duration {
        Duration::from_secs_f64((self.base_period.as_secs_f64() / self.scale).max(0.0))
    }

    /// Idempotent: starting an already-running timer just leaves it
    /// where it was.
    pub fn start(&mut self, clock: &dyn SystemTimeInterface) {
        if self.running {
            return;
        }
        self.running = true;
        self.next_due = clock.time_get_nanoseconds() + self.effective_period();
    }

    /// Idempotent: stopping an already-stopped timer is a no-op.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Call on every host poll. Returns `true` at most once per call even
    /// if multiple periods have elapsed since the last `poll` (coalesce
    /// policy above); the schedule always advances from `now`, never from
    /// the missed due time, so a stall never produces a burst of fires.
    pub fn poll(&mut self, clock: &dyn SystemTimeInterface) -> bool {
        if !self.running {
            return false;
        }
        let now = clock.time_get_nanoseconds();
        if now >= self.next_due {
            self.next_due = now + self.effective_period();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use base::system::VirtualTime;

    #[test]
    fn start_stop_are_idempotent() {
        let clock = VirtualTime::new(Duration::ZERO);
        let mut timer = Timer::new(Duration::from_millis(32));
        timer.start(&clock);
        let due_after_first_start = timer.next_due;
        timer.start(&clock);
        assert_eq!(timer.next_due, due_after_first_start);
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn fires_once_period_elapsed() {
        let clock = VirtualTime::new(Duration::ZERO);
        let mut timer = Timer::new(Duration::from_millis(32));
        timer.start(&clock);
        assert!(!timer.poll(&clock));
        clock.advance(Duration::from_millis(32));
        assert!(timer.poll(&clock));
        assert!(!timer.poll(&clock));
    }

    #[test]
    fn stalled_host_coalesces_to_a_single_fire() {
        let clock = VirtualTime::new(Duration::ZERO);
        let mut timer = Timer::new(Duration::from_millis(32));
        timer.start(&clock);
        clock.advance(Duration::from_millis(32 * 5));
        assert!(timer.poll(&clock));
        assert!(!timer.poll(&clock));
    }

    #[test]
    fn scaling_up_shortens_the_effective_period() {
        let clock = VirtualTime::new(Duration::ZERO);
        let mut timer = Timer::new(Duration::from_millis(32));
        timer.set_scale(2.0);
        timer.start(&clock);
        clock.advance(Duration::from_millis(16));
        assert!(timer.poll(&clock));
    }

    #[test]
    fn stopped_timer_never_fires() {
        let clock = VirtualTime::new(Duration::ZERO);
        let mut timer = Timer::new(Duration::from_millis(32));
        timer.start(&clock);
        timer.stop();
        clock.advance(Duration::from_secs(10));
        assert!(!timer.poll(&clock));
    }
}
