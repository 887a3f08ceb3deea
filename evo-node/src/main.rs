use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use evo_masternode::DeterministicMnManager;
use evo_spork::{
    BroadcastRequest, OutboundSpork, SporkManager, SporkNetworkAdapter, SystemClock,
};

mod activation;
mod config;

use activation::SporkGatedActivation;
use config::{parse_dip3_params, parse_spork_assignment, ConfigOverrides, NodeConfig};

const APP_NAME: &str = "evo-node";
const CONFIG_NAME: &str = "node-config";
const SPORK_FILE: &str = "sporks.dat";

/// Masternode registry and spork node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Spork signer public key (hex). May be given several times.
    #[arg(long = "sporkaddr")]
    spork_addresses: Vec<String>,

    /// Number of spork signers that must agree
    #[arg(long = "minsporkkeys")]
    min_spork_keys: Option<usize>,

    /// Secret key (hex) of this node's spork signer
    #[arg(long = "sporkkey")]
    spork_key: Option<String>,

    /// DIP3 activation and enforcement heights, as <activation>:<enforcement>
    #[arg(long = "dip3params")]
    dip3_params: Option<String>,

    /// Sign and relay a spork value at startup, as NAME=VALUE. Needs --sporkkey.
    #[arg(long = "spork")]
    spork_updates: Vec<String>,

    /// Directory for sporks.dat
    #[arg(long)]
    datadir: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to the log file (optional). If not provided, logs will only go to stdout.
    #[arg(long)]
    log_file: Option<String>,

    /// Load and store the configuration at this path instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    // Command-line overrides apply to this run only and are never written back.
    let stored_cfg = load_config(args.config.as_deref());
    let overrides = ConfigOverrides {
        spork_addresses: args.spork_addresses.clone(),
        min_spork_keys: args.min_spork_keys,
        dip3_heights: args.dip3_params.as_deref().map(parse_dip3_params).transpose()?,
        data_dir: args.datadir.clone(),
    };
    let cfg = stored_cfg.with_overrides(&overrides);
    info!("Loaded configuration: {:#?}", cfg);

    let data_dir = match &cfg.data_dir {
        Some(dir) => dir.clone(),
        None => confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    let spork_path = data_dir.join(SPORK_FILE);

    let spork_config = cfg
        .spork_config(args.spork_key.as_deref())
        .context("invalid spork configuration")?;
    let sporks = Arc::new(SporkManager::new(spork_config, Arc::new(SystemClock))?);
    // Only this node's own signed messages survive a restart.
    if spork_path.exists() {
        match sporks.load_from_disk(&spork_path) {
            Ok(kept) => info!("Restored {} locally signed spork messages", kept),
            Err(e) => warn!("Ignoring unreadable {}: {}", spork_path.display(), e),
        }
    }
    for (name, value) in sporks.show() {
        info!("{} = {}", name, value);
    }

    let gate = SporkGatedActivation::new(cfg.dip3_activation_height, cfg.dip3_enforcement_height, sporks.clone());
    let registry = DeterministicMnManager::with_activation(cfg.registry_params(), Arc::new(gate));
    info!(
        "Masternode registry ready: activation height {}, enforcement height {}, reorg depth {}, state {:?}",
        cfg.dip3_activation_height,
        cfg.dip3_enforcement_height,
        registry.params().max_reorg_depth,
        registry.state()
    );

    let (shutdown_sender, _) = broadcast::channel(1);
    let (inbound_tx, inbound_rx) = mpsc::channel(1024);
    let (request_tx, request_rx) = mpsc::channel(16);
    let (outbound_tx, mut outbound_rx) = mpsc::channel(1024);

    let adapter = SporkNetworkAdapter::new(sporks.clone(), cfg.spork_tick_interval());
    let adapter_task = tokio::spawn(adapter.run(inbound_rx, request_rx, outbound_tx, shutdown_sender.subscribe()));

    // No peer transport is attached to this process; outbound work is only logged.
    tokio::spawn(async move {
        while let Some(command) = outbound_rx.recv().await {
            match command {
                OutboundSpork::Relay { except, message } => {
                    info!("Relay spork {} = {} (skip peer {:?})", message.spork_id, message.value, except)
                }
                OutboundSpork::SendTo { peer, message } => {
                    info!("Send spork {} = {} to peer {}", message.spork_id, message.value, peer)
                }
            }
        }
    });

    for update in &args.spork_updates {
        let (def, value) = parse_spork_assignment(update)?;
        request_tx.send(BroadcastRequest { spork_id: def.id, value }).await?;
    }

    info!("Node is running. Press Ctrl+C to shut down gracefully.");
    signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Ctrl+C received, sending shutdown signal.");
    let _ = shutdown_sender.send(());
    drop(inbound_tx);
    if let Err(e) = adapter_task.await {
        error!("Spork adapter task failed: {}", e);
    }

    if let Err(e) = sporks.save_to_disk(&spork_path) {
        error!("Failed to save sporks to {}: {}", spork_path.display(), e);
    }
    store_config(args.config.as_deref(), &stored_cfg);
    Ok(())
}

fn init_logging(level: &str, log_file: Option<&str>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let default_level = level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let (writer, guard) = match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create log file {}", path))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    // Also installs the bridge that forwards `log` records from the library crates.
    builder
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {}", e))?;
    Ok(guard)
}

fn load_config(path: Option<&Path>) -> NodeConfig {
    let loaded = match path {
        Some(path) => confy::load_path(path),
        None => confy::load(APP_NAME, CONFIG_NAME),
    };
    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:?}. Using default.", e);
            NodeConfig::default()
        }
    }
}

fn store_config(path: Option<&Path>, cfg: &NodeConfig) {
    let stored = match path {
        Some(path) => confy::store_path(path, cfg),
        None => confy::store(APP_NAME, CONFIG_NAME, cfg),
    };
    match stored {
        Ok(()) => info!("Configuration updated and stored."),
        Err(e) => error!("Failed to store configuration: {:?}", e),
    }
}
