//! Server-local per-client state (§3): a bounded input ring, a health
//! scalar, and the outstanding-ping bookkeeping behind the RTT heartbeat.

use std::collections::BTreeMap;

use command::{ClientId, Clock, Input};
use transport::{PingToken, Transport};

pub struct Connection {
    pub client_id: ClientId,
    pub transport: Box<dyn Transport>,
    pub name: Option<String>,
    inputs: BTreeMap<Clock, Input>,
    pub health: i64,
    outstanding_ping: Option<PingToken>,
}

impl Connection {
    pub fn new(client_id: ClientId, transport: Box<dyn Transport>) -> Self {
        Self {
            client_id,
            transport,
            name: None,
            inputs: BTreeMap::new(),
            health: 0,
            outstanding_ping: None,
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn record_input(&mut self, clock: Clock, input: Input) {
        self.inputs.insert(clock, input);
    }

    /// §4.G step 2: the newest input whose clock is at most `server_clock`,
    /// plus the maximum lead among any inputs still ahead of it.
    pub fn best_input(&self, server_clock: Clock) -> (Option<(Clock, Input)>, i64) {
        let best = self.inputs.range(..=server_clock).next_back().map(|(&clock, &input)| (clock, input));
        let ahead = self
            .inputs
            .keys()
            .filter(|&&clock| clock > server_clock)
            .map(|&clock| (clock - server_clock) as i64)
            .max()
            .unwrap_or(0);
        (best, ahead)
    }

    /// §4.G step 3: positive if ahead, negative if the selected input is
    /// older than `server_clock`, zero if it matches exactly.
    pub fn update_health(&mut self, best: Option<(Clock, Input)>, server_clock: Clock, ahead: i64) {
        self.health = if ahead > 0 {
            ahead
        } else {
            match best {
                Some((clock, _)) if clock < server_clock => clock as i64 - server_clock as i64,
                _ => 0,
            }
        };
    }

    /// Drops inputs older than `server_clock - horizon` (§4.G step 3).
    pub fn prune_inputs(&mut self, server_clock: Clock, horizon: u64) {
        let floor = server_clock.saturating_sub(horizon);
        self.inputs.retain(|&clock, _| clock >= floor);
    }

    pub fn outstanding_ping(&self) -> Option<PingToken> {
        self.outstanding_ping
    }

    pub fn set_outstanding_ping(&mut self, token: Option<PingToken>) {
        self.outstanding_ping = token;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use transport::channel::channel_pair;

    fn connection() -> Connection {
        let (a, _b) = channel_pair(std::time::Duration::from_millis(10));
        Connection::new(1, Box::new(a))
    }

    #[test]
    fn best_input_is_the_newest_at_or_before_server_clock() {
        let mut connection = connection();
        connection.record_input(3, Input::default());
        connection.record_input(5, Input::default());
        connection.record_input(9, Input::default());
        let (best, ahead) = connection.best_input(5);
        assert_eq!(best.map(|(c, _)| c), Some(5));
        assert_eq!(ahead, 4);
    }

    #[test]
    fn no_input_at_or_before_server_clock_reports_none() {
        let mut connection = connection();
        connection.record_input(9, Input::default());
        let (best, ahead) = connection.best_input(5);
        assert!(best.is_none());
        assert_eq!(ahead, 4);
    }

    #[test]
    fn health_is_negative_when_behind() {
        let mut connection = connection();
        connection.update_health(Some((3, Input::default())), 5, 0);
        assert_eq!(connection.health, -2);
    }

    #[test]
    fn health_is_positive_when_ahead() {
        let mut connection = connection();
        connection.update_health(Some((9, Input::default())), 5, 4);
        assert_eq!(connection.health, 4);
    }

    #[test]
    fn prune_drops_inputs_older_than_the_horizon() {
        let mut connection = connection();
        connection.record_input(1, Input::default());
        connection.record_input(40, Input::default());
        connection.prune_inputs(40, 32);
        let (best, _) = connection.best_input(40);
        assert_eq!(best.map(|(c, _)| c), Some(40));
    }
}
