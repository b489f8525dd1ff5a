//! A real [`Transport`] over TCP. Frames are length-prefixed so messages
//! arrive whole, never fragmented, matching the Transport contract in
//! §6. A leading tag byte multiplexes the liveness probe (ping/pong)
//! over the same stream as ordinary wire messages.
//!
//! All socket I/O runs on a background multi-thread `tokio::Runtime`
//! owned by the transport; the reader/writer tasks only ever push onto
//! or pop from a mutex-protected queue (§5: "if an implementation uses
//! real threads for transport I/O, it must interpose a lock-free or
//! mutex-protected queue").

use std::{
    collections::{HashMap, VecDeque},
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    runtime::Runtime,
    sync::mpsc::{unbounded_channel, UnboundedSender},
};

use crate::{PingToken, Transport};

const TAG_DATA: u8 = 0;
const TAG_PING: u8 = 1;
const TAG_PONG: u8 = 2;

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;
type PongQueue = Arc<Mutex<VecDeque<(PingToken, Duration)>>>;

pub struct TcpTransport {
    inbound: Queue,
    pongs: PongQueue,
    open: Arc<AtomicBool>,
    outbound_tx: UnboundedSender<(u8, Vec<u8>)>,
    next_ping_token: AtomicU64,
    pending_pings: Arc<Mutex<HashMap<PingToken, Instant>>>,
    // Keeps the background runtime alive for as long as the transport is.
    _runtime: Arc<Runtime>,
}

impl TcpTransport {
    pub fn connect(addr: &str) -> io::Result<Self> {
        let runtime = Arc::new(Runtime::new()?);
        let stream = runtime.block_on(TcpStream::connect(addr))?;
        Ok(Self::from_stream(stream, runtime))
    }

    fn from_stream(stream: TcpStream, runtime: Arc<Runtime>) -> Self {
        let (read_half, write_half) = stream.into_split();
        let inbound: Queue = Arc::new(Mutex::new(VecDeque::new()));
        let pongs: PongQueue = Arc::new(Mutex::new(VecDeque::new()));
        let open = Arc::new(AtomicBool::new(true));
        let pending_pings = Arc::new(Mutex::new(HashMap::new()));
        let (outbound_tx, mut outbound_rx) = unbounded_channel::<(u8, Vec<u8>)>();

        {
            let outbound_tx = outbound_tx.clone();
            runtime.spawn(async move {
                let mut write_half = write_half;
                while let Some((tag, payload)) = outbound_rx.recv().await {
                    if write_frame(&mut write_half, tag, &payload).await.is_err() {
                        break;
                    }
                }
            });

            let inbound = inbound.clone();
            let pongs = pongs.clone();
            let open = open.clone();
            let pending_pings = pending_pings.clone();
            runtime.spawn(async move {
                let mut read_half = read_half;
                loop {
                    match read_frame(&mut read_half).await {
                        Ok((tag, payload)) => match tag {
                            TAG_DATA => inbound.lock().unwrap().push_back(payload),
                            TAG_PING => {
                                let _ = outbound_tx.send((TAG_PONG, payload));
                            }
                            TAG_PONG => {
                                if payload.len() == 8 {
                                    let token = u64::from_le_bytes(payload.try_into().unwrap());
                                    if let Some(sent_at) = pending_pings.lock().unwrap().remove(&token) {
                                        pongs.lock().unwrap().push_back((token, sent_at.elapsed()));
                                    }
                                }
                            }
                            _ => {}
                        },
                        Err(_) => {
                            open.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }
            });
        }

        Self {
            inbound,
            pongs,
            open,
            outbound_tx,
            next_ping_token: AtomicU64::new(0),
            pending_pings,
            _runtime: runtime,
        }
    }
}

impl Transport for TcpTransport {
    fn send(&self, bytes: Vec<u8>) {
        let _ = self.outbound_tx.send((TAG_DATA, bytes));
    }

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
        let token = self.next_ping_token.fetch_add(1, Ordering::SeqCst);
        self.pending_pings.lock().unwrap().insert(token, Instant::now());
        let _ = self.outbound_tx.send((TAG_PING, token.to_le_bytes().to_vec()));
        token
    }

    fn try_recv_pong(&self) -> Option<(PingToken, Duration)> {
        self.pongs.lock().unwrap().pop_front()
    }
}

async fn write_frame(write_half: &mut tokio::net::tcp::OwnedWriteHalf, tag: u8, payload: &[u8]) -> io::Result<()> {
    write_half.write_u8(tag).await?;
    write_half.write_u32_le(payload.len() as u32).await?;
    write_half.write_all(payload).await?;
    Ok(())
}

async fn read_frame(read_half: &mut tokio::net::tcp::OwnedReadHalf) -> io::Result<(u8, Vec<u8>)> {
    let tag = read_half.read_u8().await?;
    let len = read_half.read_u32_le().await? as usize;
    let mut payload = vec![0u8; len];
    read_half.read_exact(&mut payload).await?;
    Ok((tag, payload))
}

/// Listens for incoming connections; accepted peers arrive as plain
/// [`TcpTransport`]s through [`TcpListenerTransport::try_accept`], polled
/// from the server's tick loop the same way connection queues are (§5).
pub struct TcpListenerTransport {
    accepted: AcceptedQueue,
    runtime: Arc<Runtime>,
}

type AcceptedQueue = Arc<Mutex<VecDeque<(SocketAddr, TcpTransport)>>>;

impl TcpListenerTransport {
    pub fn bind(addr: &str) -> io::Result<Self> {
        let runtime = Arc::new(Runtime::new()?);
        let listener = runtime.block_on(TcpListener::bind(addr))?;
        let accepted: AcceptedQueue = Arc::new(Mutex::new(VecDeque::new()));

        {
            let accepted = accepted.clone();
            let runtime_for_conns = runtime.clone();
            runtime.spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, peer_addr)) => {
                            let transport = TcpTransport::from_stream(stream, runtime_for_conns.clone());
                            accepted.lock().unwrap().push_back((peer_addr, transport));
                        }
                        Err(_) => break,
                    }
                }
            });
        }

        Ok(Self { accepted, runtime })
    }

    /// Non-blocking: returns the next accepted connection, if any.
    pub fn try_accept(&self) -> Option<(SocketAddr, TcpTransport)> {
        self.accepted.lock().unwrap().pop_front()
    }

    pub fn local_runtime(&self) -> &Runtime {
        &self.runtime
    }
}
