//! The PID pacing controller (§4.D): paces the client's clock so it
//! stays a small, bounded number of ticks ahead of the server.

/// Three-term controller. `p = 0.1, i = 0, d = 0` is the recommended safe
/// default (§4.D) — tuning beyond that is empirical and left to the
/// caller.
#[derive(Debug, Clone, Copy)]
pub struct Pid {
    p: f64,
    i: f64,
    d: f64,
    p_error: f64,
    i_error: f64,
    d_error: f64,
}

impl Pid {
    pub const DEFAULT_P: f64 = 0.1;
    pub const DEFAULT_I: f64 = 0.0;
    pub const DEFAULT_D: f64 = 0.0;

    pub fn new(p: f64, i: f64, d: f64) -> Self {
        Self { p, i, d, p_error: 0.0, i_error: 0.0, d_error: 0.0 }
    }

    pub fn with_defaults() -> Self {
        Self::new(Self::DEFAULT_P, Self::DEFAULT_I, Self::DEFAULT_D)
    }

    /// Feeds a fresh error sample and returns `calc`.
    pub fn update(&mut self, error: f64) -> f64 {
        let prev_p_error = self.p_error;
        self.p_error = error;
        self.i_error += error;
        self.d_error = error - prev_p_error;

        self.p * self.p_error + self.i * self.i_error + self.d * self.d_error
    }

    /// The piecewise mapping from `calc` to a Timer scale (§4.D): clamped
    /// to `[0.5, 2.0]`, linear on either side of the `calc == 0` dead band.
    pub fn scale_for(calc: f64) -> f64 {
        if calc <= -1.0 {
            0.5
        } else if calc < 0.0 {
            1.0 + calc / 2.0
        } else if calc == 0.0 {
            1.0
        } else if calc < 1.0 {
            1.0 + calc
        } else {
            2.0
        }
    }

    /// Convenience: feed `error` and get the Timer scale directly.
    pub fn update_scale(&mut self, error: f64) -> f64 {
        Self::scale_for(self.update(error))
    }
}

impl Default for Pid {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scale_floors_at_half_for_large_negative_calc() {
        assert_eq!(Pid::scale_for(-5.0), 0.5);
        assert_eq!(Pid::scale_for(-1.0), 0.5);
    }

    #[test]
    fn scale_ceils_at_two_for_large_positive_calc() {
        assert_eq!(Pid::scale_for(5.0), 2.0);
        assert_eq!(Pid::scale_for(1.0), 2.0);
    }

    #[test]
    fn scale_is_one_at_dead_band() {
        assert_eq!(Pid::scale_for(0.0), 1.0);
    }

    #[test]
    fn scale_is_monotonic_around_the_dead_band() {
        assert!(Pid::scale_for(-0.5) < 1.0);
        assert!(Pid::scale_for(0.5) > 1.0);
        assert_eq!(Pid::scale_for(-0.5), 1.0 + (-0.5f64) / 2.0);
        assert_eq!(Pid::scale_for(0.5), 1.5);
    }

    #[test]
    fn default_gains_produce_proportional_only_response() {
        let mut pid = Pid::with_defaults();
        let calc = pid.update(2.0);
        assert!((calc - 0.2).abs() < 1e-12);
    }

    #[test]
    fn steady_zero_error_settles_to_scale_one() {
        let mut pid = Pid::with_defaults();
        for _ in 0..10 {
            let scale = pid.update_scale(0.0);
            assert_eq!(scale, 1.0);
        }
    }
}
