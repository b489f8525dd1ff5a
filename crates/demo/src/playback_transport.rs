//! A one-ended [`Transport`] used only by [`crate::DemoPlayer`]: outbound
//! sends are dropped (§4.I: "a playback driver... ignoring outbound
//! sends"), and a [`PlaybackInjector`] feeds recorded messages into the
//! inbound side on the player's schedule rather than a real peer's.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use transport::{PingToken, Transport};

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

pub struct PlaybackTransport {
    inbound: Queue,
    open: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct PlaybackInjector {
    inbound: Queue,
    open: Arc<AtomicBool>,
}

pub fn playback_transport() -> (PlaybackTransport, PlaybackInjector) {
    let inbound: Queue = Arc::new(Mutex::new(VecDeque::new()));
    let open = Arc::new(AtomicBool::new(true));
    (
        PlaybackTransport { inbound: inbound.clone(), open: open.clone() },
        PlaybackInjector { inbound, open },
    )
}

impl PlaybackInjector {
    pub fn push(&self, bytes: Vec<u8>) {
        self.inbound.lock().unwrap().push_back(bytes);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl Transport for PlaybackTransport {
    fn send(&self, _bytes: Vec<u8>) {}

    fn try_recv(&self) -> Option<Vec<u8>> {
        self.inbound.lock().unwrap().pop_front()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn send_ping(&self) -> PingToken {
        0
    }

    fn try_recv_pong(&self) -> Option<(PingToken, Duration)> {
        None
    }
}
