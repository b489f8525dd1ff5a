//! Client core (§4.H): network ingress, predictive re-simulation, clock
//! pacing, and the demo capture hook.

use std::collections::BTreeMap;
use std::time::Duration;

use base::system::SystemTimeInterface;
use command::{Buttons, ClientId, Clock, Command, Input};
use level::Level;
use log::warn;
use prediction_timer::Pid;
use sim::Snapshot;
use sim_timer::Timer;
use transport::Transport;
use wire::{decode_server, encode_client, ClientMessage, ServerMessage};

/// Receives one frame per client tick. Implemented by `demo::DemoRecorder`;
/// defined here (rather than depended on) so this crate never needs to
/// know about the demo file format.
pub trait DemoSink: Send {
    fn record(&mut self, clock: Clock, read_capture: &[ServerMessage], input_capture: Input);
}

pub struct Client {
    transport: Box<dyn Transport>,
    level: Level,
    period_ms: u64,
    client_id: Option<ClientId>,
    rtt_ms: Option<f64>,
    authoritative: Option<Snapshot>,
    authoritative_commands: Vec<Command>,
    health: Option<i64>,
    predicted: Snapshot,
    predicted_clock: Clock,
    local_inputs: BTreeMap<Clock, Input>,
    live_input: Input,
    pid: Pid,
    timer: Timer,
    demo_sink: Option<Box<dyn DemoSink>>,
}

impl Client {
    /// §4.H: opens the transport and sends `Hello{name}`.
    pub fn connect(transport: Box<dyn Transport>, level: Level, period_ms: u64, name: impl Into<String>) -> Self {
        transport.send(encode_client(&ClientMessage::Hello { name: name.into() }));
        Self {
            transport,
            level,
            period_ms,
            client_id: None,
            rtt_ms: None,
            authoritative: None,
            authoritative_commands: Vec::new(),
            health: None,
            predicted: Snapshot::empty(),
            predicted_clock: 0,
            local_inputs: BTreeMap::new(),
            live_input: Input::default(),
            pid: Pid::with_defaults(),
            timer: Timer::new(Duration::from_millis(period_ms)),
            demo_sink: None,
        }
    }

    pub fn set_demo_sink(&mut self, sink: Box<dyn DemoSink>) {
        self.demo_sink = Some(sink);
    }

    /// §6 Input-capture boundary: the producer mutates the live
    /// accumulator through edge-triggered presses/releases and
    /// accumulating axis deltas; only the Client itself clones and
    /// clears it, at the start of `tick()`.
    pub fn submit_local_input(&mut self, pressed: Buttons, released: Buttons, pitch_delta: f64, yaw_delta: f64) {
        for button in pressed.iter() {
            self.live_input.set_pressed(button);
        }
        for button in released.iter() {
            self.live_input.set_released(button);
        }
        self.live_input.set_axis(pitch_delta, yaw_delta);
    }

    /// Overwrites the live input accumulator outright. Demo playback uses
    /// this to feed back the exact input recorded live for a tick, since
    /// there is no real input-capture producer during replay.
    pub fn set_live_input(&mut self, input: Input) {
        self.live_input = input;
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn health(&self) -> Option<i64> {
        self.health
    }

    pub fn predicted_clock(&self) -> Clock {
        self.predicted_clock
    }

    pub fn timer_scale(&self) -> f64 {
        self.timer.scale()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// §4.H: the most recent predicted snapshot, for the renderer.
    pub fn snapshot(&self) -> Snapshot {
        self.predicted.clone()
    }

    pub fn run(&mut self, clock: &dyn SystemTimeInterface) {
        self.timer.start(clock);
    }

    pub fn halt(&mut self) {
        self.timer.stop();
    }

    pub fn poll(&mut self, clock: &dyn SystemTimeInterface) {
        if self.timer.poll(clock) {
            self.tick();
        }
    }

    /// One client step, per §4.H's per-tick procedure.
    pub fn tick(&mut self) {
        if !self.transport.is_open() {
            return;
        }

        let frozen_input = self.live_input;
        self.live_input.clear();

        let mut read_capture = Vec::new();
        while let Some(bytes) = self.transport.try_recv() {
            let message = match decode_server(&bytes) {
                Ok(message) => message,
                Err(err) => {
                    warn!("server sent a malformed message: {err}");
                    continue;
                }
            };
            read_capture.push(message.clone());
            match message {
                ServerMessage::Hello { client_id } => self.client_id = Some(client_id),
                ServerMessage::Ping { rtt_ms } => self.rtt_ms = Some(rtt_ms),
                ServerMessage::Snapshot { snapshot, commands, health } => {
                    let is_newer = self.authoritative.as_ref().map(|s| snapshot.tick > s.tick).unwrap_or(true);
                    if is_newer {
                        if self.authoritative.is_none() {
                            self.predicted_clock = snapshot.tick;
                        }
                        self.authoritative = Some(snapshot);
                        self.authoritative_commands = commands;
                        self.health = health;
                    }
                }
            }
        }

        // `rtt_ms` is not required here: the server only grants a newly
        // joined connection a single tick of grace before it expects an
        // Input (§4.G step 2), which is before the first ping/pong round
        // trip can possibly resolve. Default to 0 until a real RTT is
        // known; it only feeds the pacing estimate below, never whether
        // an Input gets sent at all.
        let (Some(client_id), Some(authoritative)) = (self.client_id, self.authoritative.clone()) else {
            return;
        };
        let rtt_ms = self.rtt_ms.unwrap_or(0.0);

        let predicted_clock_before = self.predicted_clock;
        self.local_inputs.insert(predicted_clock_before, frozen_input);

        let mut current = authoritative.clone();
        while current.tick < predicted_clock_before + 1 {
            let commands = self.commands_for_tick(client_id, current.tick);
            let mut target = Snapshot::empty();
            sim::tick(&mut target, &current, &commands, &self.level, self.period_ms);
            current = target;
        }
        self.predicted = current.clone();
        self.predicted_clock = predicted_clock_before + 1;

        let actual_ahead = self.predicted_clock as i64 - authoritative.tick as i64;
        let target_ahead = ((rtt_ms / 2.0) / self.period_ms as f64).ceil() as i64 + 1;
        let error = match self.health {
            Some(health) => (health - 1) as f64,
            None => (actual_ahead - target_ahead) as f64,
        };
        let scale = self.pid.update_scale(error);
        self.timer.set_scale(scale);

        self.transport
            .send(encode_client(&ClientMessage::Input { clock: predicted_clock_before, input: frozen_input }));

        if let Some(sink) = self.demo_sink.as_mut() {
            sink.record(predicted_clock_before, &read_capture, frozen_input);
        }

        self.local_inputs.retain(|&clock, _| clock >= authoritative.tick);
    }

    /// Builds the command list for one prediction step at `clock`:
    /// `authoritative_commands` with this client's own `Input` entry
    /// replaced by its locally buffered input for that clock (§4.H step 6).
    fn commands_for_tick(&self, client_id: ClientId, clock: Clock) -> Vec<Command> {
        let mut commands = self.authoritative_commands.clone();
        let input = self.local_input_for(clock);
        match commands.iter_mut().find(|command| matches!(command, Command::Input { client_id: id, .. } if *id == client_id))
        {
            Some(slot) => *slot = Command::Input { client_id, clock, input },
            None => commands.push(Command::Input { client_id, clock, input }),
        }
        commands
    }

    /// Repeats the nearest earlier local input when the exact clock is
    /// missing, per the resolved Open Question on this Programmer-kind
    /// error (§7, §9).
    fn local_input_for(&self, clock: Clock) -> Input {
        if let Some(&input) = self.local_inputs.get(&clock) {
            return input;
        }
        match self.local_inputs.range(..clock).next_back() {
            Some((&found_clock, &input)) => {
                warn!("missing local input for clock {clock}; repeating input from clock {found_clock}");
                input
            }
            None => {
                warn!("missing local input for clock {clock}; no prior input to repeat, using a blank input");
                Input::default()
            }
        }
    }
}
