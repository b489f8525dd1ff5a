use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// Injected monotonic clock. Never read from process-global time inside
/// the simulation; everything that needs "now" takes one of these so
/// tests can supply virtual time.
pub trait SystemTimeInterface: std::fmt::Debug {
    fn time_get_nanoseconds(&self) -> Duration;
}

#[derive(Debug, Clone)]
pub struct System {
    pub time: Arc<SystemTime>,
}

impl System {
    pub fn new() -> Self {
        Self {
            time: Arc::new(SystemTime::new()),
        }
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTimeInterface for System {
    fn time_get_nanoseconds(&self) -> Duration {
        self.time.time_get_nanoseconds()
    }
}

/// Wall-clock backed implementation of [`SystemTimeInterface`].
#[derive(Debug)]
pub struct SystemTime {
    start: std::time::Instant,
}

impl SystemTime {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTimeInterface for SystemTime {
    fn time_get_nanoseconds(&self) -> Duration {
        self.start.elapsed()
    }
}

/// A manually advanced clock for tests and demo playback: time only moves
/// when [`VirtualTime::advance`] is called, never from `Instant::now()`.
#[derive(Debug, Clone)]
pub struct VirtualTime {
    now: Arc<Mutex<Duration>>,
}

impl VirtualTime {
    pub fn new(start: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, at: Duration) {
        *self.now.lock().unwrap() = at;
    }
}

impl SystemTimeInterface for VirtualTime {
    fn time_get_nanoseconds(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}
