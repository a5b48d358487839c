use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ams2_results::driver::back_off;
use ams2_results::{
    Config, Driver, DynRegion, JsonFileSink, RecordingRegion, RecordingWriter, RegionSource,
    SnapshotReader, TelemetryError,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Configuration file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "ams2-results.yaml";

#[derive(Parser)]
#[command(name = "ams2-results")]
#[command(about = "Saves Automobilista 2 race results as JSON files", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "AMS2_RESULTS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving result files
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Minimum milliseconds between processing passes after a saved race
    #[arg(long, global = true)]
    interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the running game and save each finished race (default)
    Watch,

    /// Run a recorded session through the detector
    Replay {
        /// Recording created with `record`
        file: PathBuf,
    },

    /// Record consistent snapshots of the live game for later replay
    Record {
        /// Output recording file
        file: PathBuf,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<usize>,

        /// Minimum milliseconds between recorded frames
        #[arg(long, default_value = "0")]
        every_ms: u64,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("failed to load {}", DEFAULT_CONFIG_FILE))?,
            None => Config::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(interval) = self.interval_ms {
            config.processing_interval_ms = interval;
        }
        config.validate().context("invalid configuration")?;

        debug!(?config, "Configuration loaded");
        Ok(config)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Cancel `token` on Ctrl+C.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl+C received, shutting down");
            token.cancel();
        }
        Err(e) => error!(error = %e, "Failed to install Ctrl+C handler"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let worker_cancel = cancel.clone();
    let result = match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            tokio::task::spawn_blocking(move || watch(&config, &worker_cancel)).await
        }
        Command::Replay { file } => {
            tokio::task::spawn_blocking(move || replay(&config, &file, &worker_cancel)).await
        }
        Command::Record { file, frames, every_ms } => {
            let every = Duration::from_millis(every_ms);
            tokio::task::spawn_blocking(move || {
                record(&config, &file, frames, every, &worker_cancel)
            })
            .await
        }
    };

    signal_task.abort();
    result.context("worker thread panicked")?
}

fn watch(config: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    println!("Waiting for race to end. Press Ctrl+C to quit...");

    let Some(region) = connect(config, cancel)? else {
        return Ok(());
    };
    run_driver(region, config, cancel)
}

fn replay(config: &Config, file: &Path, cancel: &CancellationToken) -> anyhow::Result<()> {
    let region = RecordingRegion::open(file)
        .with_context(|| format!("failed to open recording {}", file.display()))?;
    run_driver(Box::new(region), config, cancel)
}

fn run_driver(region: DynRegion, config: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    let sink = JsonFileSink::new(&config.output_dir);
    let mut driver = Driver::new(region, sink, config);

    let summary = driver.run(cancel).inspect_err(log_suggestions)?;
    info!(
        races_saved = summary.races_saved,
        sink_failures = summary.sink_failures,
        processed = summary.processed,
        attempts = summary.acquire.attempts,
        torn_reads = summary.acquire.torn_reads,
        "Stopped"
    );
    Ok(())
}

fn record(
    config: &Config,
    file: &Path,
    max_frames: Option<usize>,
    every: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let Some(region) = connect(config, cancel)? else {
        return Ok(());
    };
    let mut reader = SnapshotReader::with_expected_version(region, config.expected_version);
    let mut writer = RecordingWriter::create(file)
        .with_context(|| format!("failed to create recording {}", file.display()))?;
    info!(path = %file.display(), "Recording, press Ctrl+C to stop");

    let mut last: Option<(u32, Instant)> = None;
    while !cancel.is_cancelled() && max_frames.is_none_or(|max| writer.frames() < max) {
        let Some(snapshot) = reader.try_acquire().inspect_err(log_suggestions)? else {
            back_off(config.idle_backoff());
            continue;
        };

        let due = last.is_none_or(|(sequence, at)| {
            sequence != snapshot.sequence() && at.elapsed() >= every
        });
        if !due {
            back_off(config.idle_backoff());
            continue;
        }

        writer.append(&snapshot).context("failed to write recording frame")?;
        last = Some((snapshot.sequence(), Instant::now()));
    }

    let frames = writer.frames();
    writer.finish().context("failed to flush recording")?;
    info!(frames, path = %file.display(), "Recording saved");
    Ok(())
}

fn connect(config: &Config, cancel: &CancellationToken) -> anyhow::Result<Option<DynRegion>> {
    let region = ams2_results::connect_live(config, cancel)
        .inspect_err(log_suggestions)
        .context("failed to connect to Automobilista 2")?;
    if let Some(region) = &region {
        debug!(version = region.version(), "Live region ready");
    }
    Ok(region)
}

fn log_suggestions(error: &TelemetryError) {
    for suggestion in error.recovery_suggestions() {
        warn!("{}", suggestion);
    }
}
