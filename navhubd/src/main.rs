//! navhubd: headless runner for the NavHub core.
//!
//! Loads a TOML configuration, wires the hub together and runs until killed.
//! Every observed sentence goes to the tracing log; navigation records are
//! consolidated and reported once a second at info level.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{debug, info};

use navhub_core::{
    DecoderOptions, NavData, NavHub, OutputConfig, SimulatorConfig, SourceConfig, SourceKind,
};

#[derive(Parser, Debug)]
#[command(name = "navhubd", about = "NavHub marine navigation hub daemon")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "navhub.toml")]
    config: String,
    /// Start the simulator regardless of the config file
    #[arg(long)]
    simulator: bool,
    /// Keep the RMC heading approximation from COG disabled
    #[arg(long)]
    no_heading_from_cog: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    sources: Vec<SourceConfig>,
    outputs: Vec<OutputConfig>,
    simulator: SimulatorConfig,
    simulator_active: bool,
}

/// Matches the stock configuration shipped next to the binary.
const DEFAULT_UDP_PORT: u16 = 10110;

fn load_config(path: &str) -> anyhow::Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .unwrap_or_else(|_| include_str!("../navhub.toml").to_string());
    let mut config: FileConfig =
        toml::from_str(&raw).with_context(|| format!("invalid config file {path}"))?;

    if config.sources.is_empty() {
        config.sources.push(SourceConfig {
            id: "UDP_DEFAULT".to_string(),
            name: "Default UDP Listener".to_string(),
            enabled: false,
            kind: SourceKind::Udp {
                port: DEFAULT_UDP_PORT,
            },
        });
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navhubd=info,navhub_core=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    info!(
        "⚓ navhubd v{} starting — {} sources, {} outputs",
        env!("CARGO_PKG_VERSION"),
        config.sources.len(),
        config.outputs.len()
    );

    let decoder = DecoderOptions {
        heading_from_cog: !args.no_heading_from_cog,
    };
    let mut hub = NavHub::new(decoder, config.simulator);

    hub.set_log_callback(Arc::new(|source, sentence| {
        debug!("{source} {sentence}");
    }));

    // Consolidated view, reported once a second.
    let merged: Arc<Mutex<NavData>> = Arc::new(Mutex::new(NavData::default()));
    {
        let merged = merged.clone();
        hub.subscribe(move |update| merged.lock().unwrap().merge_from(update));
    }

    hub.load_sources(config.sources);
    hub.load_outputs(config.outputs);
    hub.set_simulator_active(args.simulator || config.simulator_active);
    if hub.simulator_active() {
        info!("🛥  simulator active");
    }

    loop {
        std::thread::sleep(Duration::from_secs(1));
        let data = merged.lock().unwrap().clone();
        if data.has_position {
            info!(
                "pos {:.5},{:.5} sog {:.1} kn cog {:.1}° ({})",
                data.latitude,
                data.longitude,
                data.speed_over_ground,
                data.course_over_ground,
                data.source_id
            );
        }
    }
}
