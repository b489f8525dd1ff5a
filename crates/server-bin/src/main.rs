mod config;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use base::system::System;
use clap::{Parser, Subcommand};
use level::Level;
use log::info;
use server::Server;
use transport::tcp::TcpListenerTransport;
use transport::Transport;

use config::ConfigServer;

#[derive(Parser)]
#[command(author, version, about = "Runs the authoritative simulation server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the level/map file (JSON).
    map: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the default configuration as JSON and exits.
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::DefaultConfig)) {
        println!("{}", serde_json::to_string_pretty(&ConfigServer::default())?);
        return Ok(());
    }

    let Some(map_path) = cli.map else {
        bail!("a map path is required unless running default-config");
    };

    let config: ConfigServer = match cli.config {
        Some(path) => {
            let text = fs::read_to_string(&path).with_context(|| format!("reading config {path:?}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {path:?}"))?
        }
        None => ConfigServer::default(),
    };

    let level_text = fs::read_to_string(&map_path).with_context(|| format!("reading map {map_path:?}"))?;
    let level: Level = serde_json::from_str(&level_text).with_context(|| format!("parsing map {map_path:?}"))?;

    let listener = TcpListenerTransport::bind(&format!("0.0.0.0:{}", config.port))
        .with_context(|| format!("binding port {}", config.port))?;
    info!("listening on port {}", config.port);

    let mut server = Server::new(level, config.period_ms);
    let clock = System::new();
    server.run(&clock);

    loop {
        while let Some((addr, transport)) = listener.try_accept() {
            if server.connection_count() >= config.max_players {
                info!("rejecting {addr}: server is full");
                transport.close();
                continue;
            }
            let client_id = server.accept(Box::new(transport));
            info!("accepted {addr} as client {client_id}");
        }
        server.poll(&clock);
        std::thread::sleep(Duration::from_millis(1));
    }
}
