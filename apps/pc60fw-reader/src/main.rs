use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pc60fw_codec::Command;
use pc60fw_node::replay::{load_capture, replay_capture, ReplayError};
use pc60fw_node::session::{SessionError, SessionSummary};
use pc60fw_node::sink::{format_tsv_line, MemorySink, SinkError, TsvFileSink};
use thiserror::Error;
use tracing::{error, info};

mod config;

use crate::config::ReaderConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the oximeter and log vitals (default)
    Run {
        /// Device address; without it the first device advertising the
        /// oximeter service is used
        address: Option<String>,
    },
    /// Feed a hex notification capture through the decoder and sink
    Replay {
        capture: PathBuf,
        /// Print samples instead of appending them to the vitals log
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the hex encoding of an outbound command
    Encode {
        #[command(subcommand)]
        command: EncodeCommands,
    },
}

#[derive(Subcommand)]
enum EncodeCommands {
    /// Enable-notifications command
    EnableNotify,
    /// Set display brightness
    Brightness { level: u8 },
}

#[derive(Debug, Error)]
enum ReaderError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[cfg(not(feature = "btleplug"))]
    #[error("built without BLE support; rebuild with `--features btleplug`")]
    BleUnavailable,
}

#[cfg(feature = "btleplug")]
async fn run_live(config: ReaderConfig, address: Option<String>) -> Result<(), ReaderError> {
    use pc60fw_node::session::Session;
    use pc60fw_transport_ble::btleplug_backend::{BtleplugLink, BtleplugLinkConfig};

    let sink = TsvFileSink::open(&config.vitals_log_path)?;
    info!("appending vitals to {}", sink.path().display());
    let mut session = Session::new(sink);

    let link_config = BtleplugLinkConfig {
        address: address.or_else(|| config.device_address.clone()),
        discovery_timeout: config.discovery_timeout,
        event_queue_capacity: config.event_queue_capacity,
        ..BtleplugLinkConfig::default()
    };
    let (mut link, mut events) = session
        .connect_with(BtleplugLink::connect(link_config))
        .await?;
    session.send_startup_commands(&mut link, &config.session_config())?;

    let outcome = tokio::select! {
        result = session.run(&mut events) => Some(result?),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            None
        }
    };
    link.close().await;
    if let Some(summary) = outcome {
        log_summary(&summary);
    }
    Ok(())
}

#[cfg(not(feature = "btleplug"))]
async fn run_live(_config: ReaderConfig, _address: Option<String>) -> Result<(), ReaderError> {
    Err(ReaderError::BleUnavailable)
}

async fn run_replay(
    config: ReaderConfig,
    capture: PathBuf,
    dry_run: bool,
) -> Result<(), ReaderError> {
    let chunks = load_capture(&capture)?;
    let session_config = config.session_config();
    let summary = if dry_run {
        let (summary, sink) = replay_capture(chunks, MemorySink::default(), &session_config).await?;
        for sample in &sink.samples {
            print!("{}", format_tsv_line(sample)?);
        }
        summary
    } else {
        let sink = TsvFileSink::open(&config.vitals_log_path)?;
        replay_capture(chunks, sink, &session_config).await?.0
    };
    log_summary(&summary);
    println!(
        "frames={} samples={} crc_errors={} discarded_bytes={} buffered={}",
        summary.decoder.frames_decoded,
        summary.samples_recorded,
        summary.decoder.checksum_failures,
        summary.decoder.bytes_discarded,
        summary.decoder.buffered
    );
    Ok(())
}

fn log_summary(summary: &SessionSummary) {
    info!(
        reason = ?summary.reason,
        samples = summary.samples_recorded,
        frames = summary.decoder.frames_decoded,
        "session finished"
    );
}

fn encode_command(command: &EncodeCommands) -> String {
    let command = match command {
        EncodeCommands::EnableNotify => Command::EnableNotifications,
        EncodeCommands::Brightness { level } => Command::SetBrightness(*level),
    };
    hex::encode(command.encode())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = std::env::var("PC60FW_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = match ReaderConfig::new(cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run { address: None }) {
        Commands::Run { address } => run_live(config, address).await,
        Commands::Replay { capture, dry_run } => run_replay(config, capture, dry_run).await,
        Commands::Encode { command } => {
            println!("{}", encode_command(&command));
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
