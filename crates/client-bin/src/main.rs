use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Context;
use base::system::System;
use clap::Parser;
use client::{Client, DemoSink};
use command::{Clock, Input};
use demo::DemoRecorder;
use level::Level;
use log::info;
use transport::tcp::TcpTransport;
use wire::ServerMessage;

/// Connects the `Client` to the shared `DemoRecorder`. The recorder stays
/// outside `Client` (which only sees the `DemoSink` trait object) so this
/// binary can read the captured frames back out once the session ends.
struct SharedRecorder(Arc<Mutex<DemoRecorder>>);

impl DemoSink for SharedRecorder {
    fn record(&mut self, clock: Clock, read_capture: &[ServerMessage], input_capture: Input) {
        self.0.lock().unwrap().record(clock, read_capture, input_capture);
    }
}

#[derive(Parser)]
#[command(author, version, about = "Connects to a simulation server (headless; rendering is out of scope)")]
struct Cli {
    host: String,
    port: u16,

    /// Path to the level/map file (JSON); must match the server's map.
    map: PathBuf,

    /// Records the session to this path as it plays.
    #[arg(long)]
    demo: Option<PathBuf>,

    #[arg(long, default_value_t = 32)]
    period_ms: u64,

    #[arg(long, default_value = "player")]
    name: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let level_text = std::fs::read_to_string(&cli.map).with_context(|| format!("reading map {:?}", cli.map))?;
    let level: Level = serde_json::from_str(&level_text).with_context(|| format!("parsing map {:?}", cli.map))?;

    let address = format!("{}:{}", cli.host, cli.port);
    let transport = TcpTransport::connect(&address).with_context(|| format!("connecting to {address}"))?;
    info!("connected to {address}");

    let mut client = Client::connect(Box::new(transport), level, cli.period_ms, cli.name.clone());

    let recorder = Arc::new(Mutex::new(DemoRecorder::new()));
    if cli.demo.is_some() {
        client.set_demo_sink(Box::new(SharedRecorder(recorder.clone())));
    }

    let clock = System::new();
    client.run(&clock);

    while client.is_open() {
        client.poll(&clock);
        std::thread::sleep(Duration::from_millis(1));
    }

    if let Some(path) = cli.demo {
        let recorded = std::mem::take(&mut *recorder.lock().unwrap());
        recorded.into_file().save(&path).with_context(|| format!("writing demo {path:?}"))?;
        info!("wrote demo to {path:?}");
    }

    Ok(())
}
