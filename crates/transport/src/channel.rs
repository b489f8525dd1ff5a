//! An in-process [`Transport`] backed by a pair of MPSC-style queues.
//! Used by same-process client/server test harnesses and by the demo
//! player, which replays a recorded message stream through the exact
//! same `Transport` boundary a live connection uses.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::{PingToken, Transport};

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;
type PongQueue = Arc<Mutex<VecDeque<(PingToken, Duration)>>>;

/// One end of an in-memory channel pair.
pub struct ChannelTransport {
    inbound: Queue,
    peer_inbound: Queue,
    open: Arc<AtomicBool>,
    peer_open: Arc<AtomicBool>,
    pongs: PongQueue,
    next_ping_token: Arc<AtomicU64>,
    simulated_rtt: Duration,
}

/// Builds a connected pair: whatever `a` sends, `b` receives, and vice
/// versa. `simulated_rtt` is the fixed round trip [`Transport::send_ping`]
/// reports — jitter itself is exercised at the `prediction-timer` level
/// via its own `Rng`-seeded tests, not here.
pub fn channel_pair(simulated_rtt: Duration) -> (ChannelTransport, ChannelTransport) {
    let queue_a: Queue = Arc::new(Mutex::new(VecDeque::new()));
    let queue_b: Queue = Arc::new(Mutex::new(VecDeque::new()));
    let open_a = Arc::new(AtomicBool::new(true));
    let open_b = Arc::new(AtomicBool::new(true));

    let a = ChannelTransport {
        inbound: queue_a.clone(),
        peer_inbound: queue_b.clone(),
        open: open_a.clone(),
        peer_open: open_b.clone(),
        pongs: Arc::new(Mutex::new(VecDeque::new())),
        next_ping_token: Arc::new(AtomicU64::new(0)),
        simulated_rtt,
    };
    let b = ChannelTransport {
        inbound: queue_b,
        peer_inbound: queue_a,
        open: open_b,
        peer_open: open_a,
        pongs: Arc::new(Mutex::new(VecDeque::new())),
        next_ping_token: Arc::new(AtomicU64::new(0)),
        simulated_rtt,
    };
    (a, b)
}

impl Transport for ChannelTransport {
    fn send(&self, bytes: Vec<u8>) {
        if self.is_open() {
            self.peer_inbound.lock().unwrap().push_back(bytes);
        }
    }

    fn try_recv(&self) -> Option<Vec<u8>> {
        self.inbound.lock().unwrap().pop_front()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && self.peer_open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn send_ping(&self) -> PingToken {
        let token = self.next_ping_token.fetch_add(1, Ordering::SeqCst);
        self.pongs.lock().unwrap().push_back((token, self.simulated_rtt));
        token
    }

    fn try_recv_pong(&self) -> Option<(PingToken, Duration)> {
        self.pongs.lock().unwrap().pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_flow_fifo_both_ways() {
        let (a, b) = channel_pair(Duration::from_millis(20));
        a.send(b"one".to_vec());
        a.send(b"two".to_vec());
        assert_eq!(b.try_recv(), Some(b"one".to_vec()));
        assert_eq!(b.try_recv(), Some(b"two".to_vec()));
        assert_eq!(b.try_recv(), None);
    }

    #[test]
    fn closing_either_end_closes_the_pair() {
        let (a, b) = channel_pair(Duration::from_millis(20));
        assert!(a.is_open() && b.is_open());
        a.close();
        assert!(!a.is_open());
        assert!(!b.is_open());
    }

    #[test]
    fn ping_reports_the_simulated_rtt() {
        let (a, _b) = channel_pair(Duration::from_millis(32));
        let token = a.send_ping();
        let (got_token, rtt) = a.try_recv_pong().unwrap();
        assert_eq!(token, got_token);
        assert_eq!(rtt, Duration::from_millis(32));
    }
}
