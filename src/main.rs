use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quiet_read::audio::list_input_devices;
use quiet_read::config::DEFAULT_CONFIG_PATH;
use quiet_read::{
    create_router, AlertPlayer, AppState, CaptureBackend, CaptureBackendFactory, CaptureSource,
    Config, ControllerOptions, RodioAlertPlayer, SessionController, SessionHandle, SessionPhase,
    SessionSnapshot, SilentAlertPlayer,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quiet-read")]
#[command(about = "Reading timer that pauses itself when the room gets too loud")]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a session with a terminal view
    Run(RunArgs),
    /// Serve the HTTP control API
    Serve(CaptureArgs),
    /// List audio input devices
    Devices,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Session length in minutes
    #[arg(short, long)]
    minutes: Option<i64>,

    /// Noise level (1-100) above which the timer pauses
    #[arg(short, long)]
    sensitivity: Option<i64>,

    #[command(flatten)]
    capture: CaptureArgs,
}

#[derive(Args, Default)]
struct CaptureArgs {
    /// Replay a WAV file instead of listening to the microphone
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Never play the alert sound
    #[arg(long)]
    silent: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run_terminal(cfg, args).await,
        Command::Serve(args) => serve(cfg, args).await,
        Command::Devices => print_devices(),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the terminal view
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spawn_controller(cfg: &Config, capture: &CaptureArgs) -> (SessionHandle, JoinHandle<()>) {
    let source = match &capture.input {
        Some(path) => CaptureSource::File(path.clone()),
        None => cfg.capture_source(),
    };
    let backend: Arc<dyn CaptureBackend> =
        Arc::from(CaptureBackendFactory::create(source, cfg.analyser()));

    let alert: Arc<dyn AlertPlayer> = if capture.silent || !cfg.alert.enabled {
        Arc::new(SilentAlertPlayer)
    } else {
        Arc::new(RodioAlertPlayer::new(cfg.alert_sound(), cfg.alert.volume))
    };

    let options = ControllerOptions {
        default_sensitivity: cfg.session.default_sensitivity,
        tick_period: Duration::from_secs(1),
        sampler: cfg.sampler(),
    };

    SessionController::spawn(backend, alert, options)
}

// ============================================================================
// Terminal view
// ============================================================================

enum LineCommand {
    TogglePlayPause,
    GoBack,
    Sensitivity(i64),
    Download,
    Start {
        minutes: i64,
        sensitivity: Option<i64>,
    },
    Quit,
    Help,
}

fn parse_line(line: &str) -> Option<LineCommand> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "p" => LineCommand::TogglePlayPause,
        "b" => LineCommand::GoBack,
        "d" => LineCommand::Download,
        "q" => LineCommand::Quit,
        "h" | "?" => LineCommand::Help,
        "s" => LineCommand::Sensitivity(parts.next()?.parse().ok()?),
        "start" => LineCommand::Start {
            minutes: parts.next()?.parse().ok()?,
            sensitivity: match parts.next() {
                Some(value) => Some(value.parse().ok()?),
                None => None,
            },
        },
        _ => return None,
    };
    Some(command)
}

const HELP: &str = "commands: p = pause/resume, b = back to setup, s <1-100> = sensitivity, \
d = download CSV, start <minutes> [sensitivity], q = quit";

async fn run_terminal(cfg: Config, args: RunArgs) -> Result<()> {
    let (session, controller) = spawn_controller(&cfg, &args.capture);
    let exporter = cfg.exporter();
    let export_path = cfg.export_path();

    let mut updates = session.subscribe();
    let view = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            render(&snapshot);
        }
    });

    let minutes = args.minutes.unwrap_or(cfg.session.default_minutes as i64);
    let sensitivity = args
        .sensitivity
        .unwrap_or(cfg.session.default_sensitivity as i64);

    println!("{}", HELP);
    if let Err(e) = session.start_minutes(minutes, sensitivity).await {
        println!("Could not start: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(command) = parse_line(&line) else {
            if !line.trim().is_empty() {
                println!("{}", HELP);
            }
            continue;
        };

        let result = match command {
            LineCommand::TogglePlayPause => session.toggle_play_pause().await.map(|_| ()),
            LineCommand::GoBack => session.go_back().await,
            LineCommand::Sensitivity(value) => session.set_sensitivity(value).await,
            LineCommand::Start {
                minutes,
                sensitivity,
            } => {
                let sensitivity = match sensitivity {
                    Some(value) => value,
                    None => session.snapshot().await?.sensitivity as i64,
                };
                session.start_minutes(minutes, sensitivity).await
            }
            LineCommand::Download => {
                let outcome = session.download(&exporter, &export_path).await?;
                println!("{}", outcome.notice());
                Ok(())
            }
            LineCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            LineCommand::Quit => break,
        };

        if let Err(e) = result {
            println!("{}", e);
        }
    }

    session.shutdown().await?;
    view.abort();
    if let Err(e) = controller.await {
        warn!("Session controller task failed: {}", e);
    }

    Ok(())
}

fn render(snapshot: &SessionSnapshot) {
    if let Some(error) = &snapshot.capture_error {
        if snapshot.phase == SessionPhase::Setup {
            println!("Microphone unavailable: {}", error);
        }
    }

    match snapshot.phase {
        SessionPhase::Setup => {
            println!(
                "[setup] sensitivity {} | {} readings kept | type: start <minutes> [sensitivity]",
                snapshot.sensitivity,
                snapshot.history.len()
            );
        }
        SessionPhase::Completed => {
            println!(
                "[completed] {} readings recorded | d = download, b = back",
                snapshot.history.len()
            );
        }
        phase => {
            println!(
                "[{}] {} left ({:.0}%) | level {:>3} | sensitivity {:>3} | {} readings",
                phase,
                snapshot.remaining_clock(),
                snapshot.progress_percent(),
                snapshot.displayed_level,
                snapshot.sensitivity,
                snapshot.history.len()
            );
            if phase == SessionPhase::PausedByWarning {
                println!("!! Too loud. Quiet down, then press p to resume.");
            }
        }
    }
}

// ============================================================================
// HTTP server
// ============================================================================

async fn serve(cfg: Config, args: CaptureArgs) -> Result<()> {
    let (session, controller) = spawn_controller(&cfg, &args);

    let state = AppState::new(session.clone(), cfg.exporter())
        .with_export_filename(cfg.export.filename.clone())
        .with_default_minutes(cfg.session.default_minutes);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    session.shutdown().await?;
    if let Err(e) = controller.await {
        warn!("Session controller task failed: {}", e);
    }

    Ok(())
}

fn print_devices() -> Result<()> {
    let devices = list_input_devices().context("Failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("No input devices found");
    }

    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        let format = match (device.sample_rate, device.channels) {
            (Some(rate), Some(channels)) => format!("{} Hz, {} ch", rate, channels),
            _ => "format unknown".to_string(),
        };
        println!("{} {} ({})", marker, device.name, format);
    }

    Ok(())
}
