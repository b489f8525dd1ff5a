//! Server core (§4.G): connection registry, input demultiplexing, the
//! tick loop, and broadcast.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use base::system::SystemTimeInterface;
use command::{ClientId, Clock, Command, PlayerAction};
use level::Level;
use log::{info, warn};
use sim::Snapshot;
use sim_timer::Timer;
use transport::Transport;
use wire::{decode_client, encode_server, ClientMessage, ServerMessage};

use crate::connection::Connection;

/// Snapshot-ring size (§4.G): "recommended 32". Also the horizon beyond
/// which a client's stale inputs are pruned and unresponsive clients are
/// force-disconnected.
pub const SNAPSHOT_MAX: u64 = 32;

pub struct Server {
    level: Level,
    period_ms: u64,
    connections: HashMap<ClientId, Connection>,
    next_client_id: ClientId,
    pending_commands: Vec<Command>,
    current: Snapshot,
    snapshot_ring: Vec<Option<Snapshot>>,
    commands_ring: Vec<Option<Vec<Command>>>,
    timer: Timer,
}

impl Server {
    pub fn new(level: Level, period_ms: u64) -> Self {
        Self {
            level,
            period_ms,
            connections: HashMap::new(),
            next_client_id: 1,
            pending_commands: Vec::new(),
            current: Snapshot::empty(),
            snapshot_ring: vec![None; SNAPSHOT_MAX as usize],
            commands_ring: vec![None; SNAPSHOT_MAX as usize],
            timer: Timer::new(Duration::from_millis(period_ms)),
        }
    }

    pub fn clock(&self) -> Clock {
        self.current.tick
    }

    pub fn current_snapshot(&self) -> &Snapshot {
        &self.current
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// §4.G: assigns a monotonically increasing identifier and registers
    /// a `Player(add)` command for the next tick.
    pub fn accept(&mut self, transport: Box<dyn Transport>) -> ClientId {
        let client_id = self.next_client_id;
        self.next_client_id += 1;
        self.connections.insert(client_id, Connection::new(client_id, transport));
        self.pending_commands.push(Command::Player { client_id, action: PlayerAction::Add });
        info!("client {client_id} accepted");
        client_id
    }

    /// §4.G: registers a `Player(remove)` for the next tick and drops the
    /// connection from the registry immediately.
    pub fn disconnect(&mut self, client_id: ClientId) {
        if self.connections.remove(&client_id).is_some() {
            self.pending_commands.push(Command::Player { client_id, action: PlayerAction::Remove });
            info!("client {client_id} disconnected");
        }
    }

    pub fn submit(&mut self, client_id: ClientId, message: ClientMessage) {
        let Some(connection) = self.connections.get_mut(&client_id) else {
            return;
        };
        match message {
            ClientMessage::Hello { name } => {
                connection.set_name(name);
                connection.transport.send(encode_server(&ServerMessage::Hello { client_id }));
            }
            ClientMessage::Input { clock, input } => {
                connection.record_input(clock, input);
            }
        }
    }

    /// One simulation step, per §4.G's per-tick procedure.
    pub fn tick(&mut self) {
        self.drain_inbound();

        let server_clock = self.current.tick;
        let mut commands: Vec<Command> = std::mem::take(&mut self.pending_commands);

        // Clients joining this very tick cannot have an Input for it yet;
        // exempt them from the no-input removal check (§8 scenario 1).
        let joining: HashSet<ClientId> = commands
            .iter()
            .filter_map(|command| match command {
                Command::Player { client_id, action: PlayerAction::Add } => Some(*client_id),
                _ => None,
            })
            .collect();

        let mut force_removed = Vec::new();
        for (&client_id, connection) in self.connections.iter_mut() {
            if joining.contains(&client_id) {
                continue;
            }
            let (best, ahead) = connection.best_input(server_clock);
            connection.update_health(best, server_clock, ahead);
            connection.prune_inputs(server_clock, SNAPSHOT_MAX);
            match best {
                Some((clock, input)) => commands.push(Command::Input { client_id, clock, input }),
                None => force_removed.push(client_id),
            }
        }
        for client_id in force_removed {
            commands.push(Command::Player { client_id, action: PlayerAction::Remove });
            self.connections.remove(&client_id);
            warn!("client {client_id} supplied no input within the snapshot horizon; disconnecting");
        }

        let prev = self.current.clone();
        let mut next = Snapshot::empty();
        sim::tick(&mut next, &prev, &commands, &self.level, self.period_ms);

        let idx = (next.tick % SNAPSHOT_MAX) as usize;
        self.snapshot_ring[idx] = Some(next.clone());
        self.commands_ring[idx] = Some(commands.clone());
        self.current = next.clone();

        self.heartbeat_and_broadcast(&next, &commands);
    }

    fn drain_inbound(&mut self) {
        let client_ids: Vec<ClientId> = self.connections.keys().copied().collect();
        for client_id in client_ids {
            loop {
                let Some(connection) = self.connections.get(&client_id) else {
                    break;
                };
                if !connection.transport.is_open() {
                    self.disconnect(client_id);
                    break;
                }
                let Some(bytes) = connection.transport.try_recv() else {
                    break;
                };
                match decode_client(&bytes) {
                    Ok(message) => self.submit(client_id, message),
                    Err(err) => {
                        warn!("client {client_id} sent a malformed message: {err}");
                        self.disconnect(client_id);
                        break;
                    }
                }
            }
        }
    }

    fn heartbeat_and_broadcast(&mut self, snapshot: &Snapshot, commands: &[Command]) {
        for connection in self.connections.values_mut() {
            match connection.outstanding_ping() {
                Some(token) => {
                    if let Some((pong_token, rtt)) = connection.transport.try_recv_pong() {
                        if pong_token == token {
                            connection
                                .transport
                                .send(encode_server(&ServerMessage::Ping { rtt_ms: rtt.as_secs_f64() * 1000.0 }));
                            connection.set_outstanding_ping(None);
                        }
                    }
                }
                None => {
                    let token = connection.transport.send_ping();
                    connection.set_outstanding_ping(Some(token));
                }
            }

            connection.transport.send(encode_server(&ServerMessage::Snapshot {
                snapshot: snapshot.clone(),
                commands: commands.to_vec(),
                health: Some(connection.health),
            }));
        }
    }

    /// §4.G: installs `tick` in the Timer at the configured rate.
    pub fn run(&mut self, clock: &dyn SystemTimeInterface) {
        self.timer.start(clock);
    }

    pub fn halt(&mut self) {
        self.timer.stop();
    }

    /// Drives the Timer; call once per host-loop iteration.
    pub fn poll(&mut self, clock: &dyn SystemTimeInterface) {
        if self.timer.poll(clock) {
            self.tick();
        }
    }
}
