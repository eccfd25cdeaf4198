//! scope-engine - Main Entry Point
//!
//! Opens the capture device, connects to the control panel's socket, starts
//! the renderer and runs the acquisition loop until interrupted.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use scope_engine::{
    acquisition::{AcquisitionEngine, AcquisitionSettings},
    capture::{
        CaptureDevice, CpalCaptureDevice, MockCaptureDevice, MockPattern, MockSignal,
        SampleReader,
    },
    config::EngineConfig,
    control::ControlChannel,
    render::{GnuplotBackend, NullBackend, RenderAdapter, RenderBackend},
    ScopeRunner, ShutdownToken,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scope-engine")]
#[command(about = "Acquisition and trigger engine of a sound-card oscilloscope", long_about = None)]
struct Args {
    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control panel socket
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Capture device name
    #[arg(long)]
    device: Option<String>,

    /// Requested sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Cycles between full renderer redraws
    #[arg(long)]
    refresh_cycles: Option<u32>,

    /// Capture from a generated test signal instead of a sound card
    #[arg(long)]
    mock: bool,

    /// Run without starting the renderer
    #[arg(long)]
    no_render: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = init_logging(args.log_dir.as_deref());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scope_engine=debug"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "scope-engine.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_or_default(path),
        None => EngineConfig::default(),
    };

    if let Some(socket) = &args.socket {
        config.socket_path = socket.clone();
    }
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate_hz = rate;
    }
    if let Some(cycles) = args.refresh_cycles {
        config.refresh_cycles = cycles;
    }

    config.validate().context("Invalid engine configuration")?;
    Ok(config)
}

/// Spawn a thread that waits for Ctrl-C and cancels `token`
fn spawn_signal_listener(token: ShutdownToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    std::thread::Builder::new()
        .name("signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Terminating...");
                        token.cancel();
                    }
                    Err(e) => tracing::warn!("Failed to listen for interrupt: {}", e),
                }
            })
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn open_device(args: &Args, config: &EngineConfig) -> Result<Box<dyn CaptureDevice>> {
    if args.mock {
        let signal = MockSignal::new(
            MockPattern::default(),
            MockPattern::Square {
                frequency: 250.0,
                amplitude: 4000.0,
            },
        );
        let device = MockCaptureDevice::new(signal, config.sample_rate_hz, config.block_frames)
            .with_realtime(true);
        return Ok(Box::new(device));
    }

    let device = CpalCaptureDevice::open(&config.device, config.sample_rate_hz, config.block_frames)
        .with_context(|| format!("Failed to open capture device '{}'", config.device))?;
    Ok(Box::new(device))
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let token = ShutdownToken::new();
    spawn_signal_listener(token.clone())?;

    tracing::info!("Setting up acquisition device");
    let device = open_device(&args, &config)?;
    tracing::info!(
        "Capturing from '{}' at {} Hz",
        device.name(),
        device.sample_rate()
    );

    tracing::info!("Setting up connection with console");
    let channel = ControlChannel::connect(&config.socket_path)
        .context("Failed to connect to the control panel")?;

    tracing::info!("Setting up oscilloscope display");
    let backend: Box<dyn RenderBackend> = if args.no_render {
        Box::new(NullBackend::new())
    } else {
        Box::new(GnuplotBackend::from_config(&config).context("Failed to start the renderer")?)
    };

    let engine = AcquisitionEngine::new(
        SampleReader::new(device).with_shutdown(token.clone()),
        AcquisitionSettings::from(&config),
    );
    let renderer = RenderAdapter::new(backend, &config);
    let mut runner = ScopeRunner::new(engine, channel, renderer, &config, token)
        .context("Failed to configure the display")?;

    let result = runner.run();
    runner.shutdown(result.is_ok());
    result.context("Acquisition stopped")?;
    Ok(())
}
