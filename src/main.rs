//! Frame Fingerprint CLI
//!
//! Fingerprints image files, compares them, and watches a frame source
//! for changes.

use clap::{Parser, Subcommand};
use frame_fingerprint::{
    capture::{FileConfig, FrameSource, ImageDirSource, SnapshotWriter, SyntheticSource},
    detection::{spawn_monitor, RecorderState, RecorderStateMachine, TickReport, Verdict},
    fingerprint::{Comparator, Extractor},
    metrics::{MetricsRegistry, MetricsSnapshot},
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

type CliResult = Result<ExitCode, Box<dyn Error>>;
type Publisher = Arc<dyn Fn(&MetricsSnapshot) + Send + Sync>;

#[derive(Parser)]
#[command(name = "frame-fingerprint", version, about = "Detect change between camera frames")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the 16x16 fingerprint of an image file
    Fingerprint { path: PathBuf },

    /// Compare two image files (exit status 0 = same, 1 = changed)
    Compare { left: PathBuf, right: PathBuf },

    /// Watch a frame source and report changed frames
    Watch {
        /// `synthetic`, `camera`, or a directory of images
        #[arg(long, default_value = "synthetic", value_parser = parse_source)]
        source: SourceKind,

        /// Stop after this many samples (0 runs until Ctrl-C)
        #[arg(long)]
        frames: Option<u32>,

        /// Milliseconds between samples
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Save a JPEG of every changed frame into this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
enum SourceKind {
    Synthetic,
    Camera,
    Directory(PathBuf),
}

fn parse_source(value: &str) -> Result<SourceKind, String> {
    match value {
        "synthetic" => Ok(SourceKind::Synthetic),
        "camera" if cfg!(feature = "camera") => Ok(SourceKind::Camera),
        "camera" => Err("camera support requires the `camera` feature".into()),
        dir => Ok(SourceKind::Directory(PathBuf::from(dir))),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => FileConfig::default(),
    };

    let result = match cli.command {
        Command::Fingerprint { path } => fingerprint(&config, path),
        Command::Compare { left, right } => compare(&config, left, right),
        Command::Watch {
            source,
            frames,
            interval_ms,
            snapshot_dir,
        } => {
            let mut config = config;
            if let Some(ms) = interval_ms {
                config.monitor.interval_ms = ms.max(1);
            }
            if let Some(dir) = snapshot_dir {
                config.output.snapshot_dir = Some(dir);
            }
            if let Some(n) = frames {
                config.output.continuous = n == 0;
                config.output.frame_count = n;
            }
            watch(config, source)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn fingerprint(config: &FileConfig, path: PathBuf) -> CliResult {
    let extractor = Extractor::from_config(&config.detector);
    let fp = extractor.extract_path(&path)?;

    print!("{}", fp.to_grid_string());
    println!("dark cells: {}/256", fp.dark_cells());
    println!("hex: {}", fp);
    Ok(ExitCode::SUCCESS)
}

fn compare(config: &FileConfig, left: PathBuf, right: PathBuf) -> CliResult {
    let extractor = Extractor::from_config(&config.detector);
    let comparator = Comparator::from_config(&config.detector);

    let a = extractor.extract_path(&left)?;
    let b = extractor.extract_path(&right)?;
    let comparison = comparator.compare(&a, &b);

    println!(
        "matching cells: {}/256 (threshold {})",
        comparison.matching,
        comparator.min_matching()
    );
    if comparison.is_same {
        println!("SAME");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("CHANGED");
        Ok(ExitCode::from(1))
    }
}

fn watch(config: FileConfig, source: SourceKind) -> CliResult {
    info!("Frame Fingerprint v{}", frame_fingerprint::VERSION);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })?;
    }

    let snapshots = match &config.output.snapshot_dir {
        Some(dir) => Some(SnapshotWriter::new(dir)?),
        None => None,
    };
    let tick_limit = (!config.output.continuous).then_some(config.output.frame_count as u64);
    let publish = start_metrics(config.output.metrics_port)?;
    let last_published = Arc::new(Mutex::new(MetricsSnapshot::default()));

    let mut recorder = RecorderStateMachine::new();
    let events = recorder.subscribe();

    let handle = {
        let publish = Arc::clone(&publish);
        let last_published = Arc::clone(&last_published);
        spawn_monitor(
            move || open_source(source),
            config,
            snapshots,
            tick_limit,
            events,
            Arc::clone(&shutdown),
            move |report: &TickReport| {
                print_report(report);
                // the monitor only ticks while recording
                let snapshot = MetricsSnapshot::from_components(
                    &report.metrics,
                    RecorderState::Recording,
                    report.dark_cells.last().copied(),
                );
                publish(&snapshot);
                if let Ok(mut last) = last_published.lock() {
                    *last = snapshot;
                }
            },
        )?
    };

    recorder.start_preview();
    recorder.toggle_recording()?;

    let summary = handle
        .join()
        .map_err(|_| "change monitor thread panicked")??;

    recorder.stop_preview();
    let final_snapshot = last_published
        .lock()
        .map(|last| last.clone())
        .unwrap_or_default()
        .with_state(recorder.state());
    publish(&final_snapshot);

    info!(
        "Processed {} samples: {} changes, {} failures",
        summary.ticks, summary.changes, summary.failed_ticks
    );
    if shutdown.load(Ordering::Relaxed) {
        warn!("Interrupted");
    }
    Ok(ExitCode::SUCCESS)
}

fn open_source(kind: SourceKind) -> Box<dyn FrameSource> {
    match kind {
        SourceKind::Synthetic => Box::new(SyntheticSource::with_seed(7).noise(4).change_every(5)),
        SourceKind::Directory(dir) => Box::new(ImageDirSource::new(dir)),
        #[cfg(feature = "camera")]
        SourceKind::Camera => Box::new(frame_fingerprint::capture::CameraSource::new()),
        #[cfg(not(feature = "camera"))]
        SourceKind::Camera => unreachable!("rejected while parsing arguments"),
    }
}

fn print_report(report: &TickReport) {
    let label = match report.verdict {
        Verdict::Priming => "priming",
        Verdict::Unchanged(_) => "same",
        Verdict::Changed(_) => "CHANGED",
    };
    println!("#{:<5} {} {}", report.sequence, report.status_line(), label);
    if let Some(path) = &report.snapshot {
        println!("       saved {}", path.display());
    }
}

#[cfg(feature = "metrics")]
fn start_metrics(port: u16) -> Result<Publisher, Box<dyn Error>> {
    use frame_fingerprint::metrics::{MetricsServer, MetricsServerConfig};

    let registry = MetricsRegistry::new()?;
    if port == 0 {
        return Ok(Arc::new(move |snapshot| registry.update(snapshot)));
    }

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    std::thread::Builder::new()
        .name("metrics-server".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Failed to start metrics runtime: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(server.run()) {
                warn!("Metrics server stopped: {}", e);
            }
        })?;

    Ok(Arc::new(move |snapshot| state.blocking_read().update(snapshot)))
}

#[cfg(not(feature = "metrics"))]
fn start_metrics(_port: u16) -> Result<Publisher, Box<dyn Error>> {
    let registry = MetricsRegistry::new()?;
    Ok(Arc::new(move |snapshot| {
        registry.update(snapshot);
        if let Ok(text) = registry.encode() {
            tracing::trace!(metrics = %text, "Metrics updated");
        }
    }))
}
