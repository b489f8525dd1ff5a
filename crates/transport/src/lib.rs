//! The Transport external interface (§6): a bidirectional, FIFO,
//! best-effort message stream with a liveness probe. Treated as an
//! opaque collaborator by the rest of the core — the server and client
//! only ever see the trait below.
//!
//! Per §5, transport callbacks (the async read tasks in [`tcp`]) never
//! call into `tick()`; they only push onto an MPSC queue that the tick
//! drains at the start of its step.

pub mod channel;
pub mod tcp;

use std::time::Duration;

pub type PingToken = u64;

/// A bidirectional message stream to one peer. `send`/`try_recv` are
/// non-blocking from the caller's point of view — the tick loop polls
/// them, it never awaits inside a tick.
pub trait Transport: Send + Sync {
    fn send(&self, bytes: Vec<u8>);

    /// Pops the oldest unread message, if any, preserving FIFO order.
    fn try_recv(&self) -> Option<Vec<u8>>;

    fn is_open(&self) -> bool;

    fn close(&self);

    /// Sends a transport-level liveness probe and returns a token to
    /// match against [`Transport::try_recv_pong`].
    fn send_ping(&self) -> PingToken;

    /// Pops the oldest unmatched pong, if any, along with the measured
    /// round-trip time.
    fn try_recv_pong(&self) -> Option<(PingToken, Duration)>;
}
