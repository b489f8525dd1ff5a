//! Demo capture and playback (§4.I). A demo is one JSON document, a list
//! of per-tick frames: the clock, every server message received that
//! tick, and the frozen local input submitted that tick. Playback drives
//! a real [`Client`] through the same `tick()` used live, so replay
//! reproduces the live snapshot stream (§8, "Demo fidelity").

mod playback_transport;

use std::{fs, path::Path};

use client::{Client, DemoSink};
use command::{Clock, Input};
use level::Level;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wire::ServerMessage;

use playback_transport::{playback_transport, PlaybackInjector};

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("demo file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed demo file: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoFrame {
    pub clock: Clock,
    pub read_capture: Vec<ServerMessage>,
    pub input_capture: Input,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoFile {
    pub ticks: Vec<DemoFrame>,
}

impl DemoFile {
    pub fn load(path: &Path) -> Result<Self, DemoError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DemoError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Appends one frame per client tick while capturing is active. Wired to
/// a live `Client` via [`Client::set_demo_sink`].
#[derive(Debug, Default)]
pub struct DemoRecorder {
    frames: Vec<DemoFrame>,
}

impl DemoRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[DemoFrame] {
        &self.frames
    }

    pub fn into_file(self) -> DemoFile {
        DemoFile { ticks: self.frames }
    }
}

impl DemoSink for DemoRecorder {
    fn record(&mut self, clock: Clock, read_capture: &[ServerMessage], input_capture: Input) {
        self.frames.push(DemoFrame { clock, read_capture: read_capture.to_vec(), input_capture });
    }
}

/// Replays a captured session against a fresh [`Client`] (§4.I).
/// `previous` has no reverse simulation: it is `first` followed by
/// iterating `next` up to the target index, exactly as specified.
pub struct DemoPlayer {
    file: DemoFile,
    level: Level,
    period_ms: u64,
    name: String,
    index: usize,
    client: Client,
    injector: PlaybackInjector,
    playing: bool,
}

impl DemoPlayer {
    pub fn load(file: DemoFile, level: Level, period_ms: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        let (client, injector) = Self::fresh_client(&level, period_ms, &name);
        Self { file, level, period_ms, name, index: 0, client, injector, playing: false }
    }

    fn fresh_client(level: &Level, period_ms: u64, name: &str) -> (Client, PlaybackInjector) {
        let (transport, injector) = playback_transport();
        let client = Client::connect(Box::new(transport), level.clone(), period_ms, name.to_string());
        (client, injector)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.file.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.ticks.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Rewinds to a freshly constructed client at frame zero.
    pub fn first(&mut self) {
        let (client, injector) = Self::fresh_client(&self.level, self.period_ms, &self.name);
        self.client = client;
        self.injector = injector;
        self.index = 0;
    }

    pub fn next(&mut self) -> bool {
        self.step()
    }

    pub fn end(&mut self) {
        while self.step() {}
    }

    pub fn previous(&mut self) {
        if self.index == 0 {
            return;
        }
        let target = self.index - 1;
        self.first();
        while self.index < target {
            if !self.step() {
                break;
            }
        }
    }

    /// Called from the host's own loop; advances one frame if playing.
    pub fn poll(&mut self) -> bool {
        if self.playing {
            self.step()
        } else {
            false
        }
    }

    fn step(&mut self) -> bool {
        let Some(frame) = self.file.ticks.get(self.index).cloned() else {
            self.playing = false;
            return false;
        };
        if frame.clock != self.client.predicted_clock() {
            warn!(
                "demo frame clock {} does not match the client's predicted clock {}",
                frame.clock,
                self.client.predicted_clock()
            );
        }
        self.client.set_live_input(frame.input_capture);
        for message in &frame.read_capture {
            self.injector.push(wire::encode_server(message));
        }
        self.client.tick();
        self.index += 1;
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use command::ClientId;
    use level::{Edge, Polygon};
    use sim::{Entity, EntityConfig, Snapshot};
    use sim_math::Vec3;
    use std::sync::Arc;

    fn flat_level() -> Level {
        Level {
            polygons: vec![Polygon {
                floor_height: 0.0,
                ceiling_height: 4.0,
                edges: vec![
                    Edge { a: (-50.0, -50.0), b: (50.0, -50.0), back_polygon: None },
                    Edge { a: (50.0, -50.0), b: (50.0, 50.0), back_polygon: None },
                    Edge { a: (50.0, 50.0), b: (-50.0, 50.0), back_polygon: None },
                    Edge { a: (-50.0, 50.0), b: (-50.0, -50.0), back_polygon: None },
                ],
            }],
            spawn_points: vec![(Vec3::ZERO, 0)],
        }
    }

    fn snapshot_with_player(tick: Clock, client_id: ClientId) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        snapshot.tick = tick;
        let entity = Entity::spawn(client_id, Arc::new(EntityConfig::default()), Vec3::ZERO, 0);
        snapshot.entities.insert(client_id, entity);
        snapshot.players.insert(client_id, client_id);
        snapshot
    }

    fn two_frame_demo() -> DemoFile {
        DemoFile {
            ticks: vec![
                DemoFrame {
                    clock: 0,
                    read_capture: vec![
                        ServerMessage::Hello { client_id: 1 },
                        ServerMessage::Ping { rtt_ms: 32.0 },
                        ServerMessage::Snapshot { snapshot: snapshot_with_player(0, 1), commands: vec![], health: Some(1) },
                    ],
                    input_capture: Input::default(),
                },
                DemoFrame {
                    clock: 1,
                    read_capture: vec![ServerMessage::Snapshot {
                        snapshot: snapshot_with_player(1, 1),
                        commands: vec![],
                        health: Some(1),
                    }],
                    input_capture: Input::default(),
                },
            ],
        }
    }

    #[test]
    fn next_drives_the_client_one_frame_at_a_time() {
        let mut player = DemoPlayer::load(two_frame_demo(), flat_level(), 32, "A");
        assert!(player.next());
        assert_eq!(player.client().client_id(), Some(1));
        assert_eq!(player.index(), 1);
        assert!(player.next());
        assert_eq!(player.index(), 2);
        assert!(!player.next());
    }

    #[test]
    fn end_runs_every_frame() {
        let mut player = DemoPlayer::load(two_frame_demo(), flat_level(), 32, "A");
        player.end();
        assert_eq!(player.index(), player.len());
    }

    #[test]
    fn previous_replays_from_the_start() {
        let mut player = DemoPlayer::load(two_frame_demo(), flat_level(), 32, "A");
        player.end();
        player.previous();
        assert_eq!(player.index(), 1);
    }

    #[test]
    fn demo_file_round_trips_through_json() {
        let file = two_frame_demo();
        let dir = std::env::temp_dir().join(format!("demo-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.demo.json");
        file.save(&path).unwrap();
        let back = DemoFile::load(&path).unwrap();
        assert_eq!(back.ticks.len(), file.ticks.len());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn recorder_captures_one_frame_per_tick() {
        let mut recorder = DemoRecorder::new();
        recorder.record(0, &[ServerMessage::Ping { rtt_ms: 1.0 }], Input::default());
        recorder.record(1, &[], Input::default());
        assert_eq!(recorder.frames().len(), 2);
        let file = recorder.into_file();
        assert_eq!(file.ticks[0].clock, 0);
    }
}
