mod command;
mod connection;
mod program;
mod telemetry;
mod transport;

use anyhow::{Context, Result};
use clap::Parser;
use command::{EngineConfig, ExecutionEngine, RunOutcome};
use connection::ConnectionManager;
use roverlink_shared::{timing, Action};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetry::{PollerConfig, TelemetryPoller};
use tokio::io::AsyncReadExt;
use transport::{HttpTransport, HttpTransportConfig, Transport};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "roverlink",
    version,
    about = "Run block programs on a Wi-Fi robot car and watch its sensors"
)]
struct Cli {
    /// Robot address: IP, host[:port] or http:// URL
    endpoint: String,

    /// Program file (generated text or JSON); `-` reads stdin
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Sensor poll interval
    #[arg(long, default_value_t = timing::TELEMETRY_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Delay after every action
    #[arg(long, default_value_t = timing::SETTLE_DELAY_MS)]
    settle_ms: u64,

    /// Per-request timeout; unbounded when omitted
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Keep logging sensor readings until Ctrl-C
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let transport_config = HttpTransportConfig {
        request_timeout: cli.timeout_ms.map(Duration::from_millis),
        ..Default::default()
    };
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(transport_config).context("creating HTTP transport")?);

    let connection = Arc::new(ConnectionManager::new(transport.clone()));
    let connected = connection
        .connect(&cli.endpoint)
        .await
        .with_context(|| format!("connecting to {}", cli.endpoint))?;
    info!("Robot ready at {}", connected.endpoint);

    let poller = Arc::new(TelemetryPoller::new(
        transport.clone(),
        connection.clone(),
        PollerConfig {
            interval: Duration::from_millis(cli.poll_interval_ms),
        },
    ));
    let _poller_handle = poller.start();

    if cli.watch {
        let poller = poller.clone();
        let period = Duration::from_millis(cli.poll_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let s = poller.snapshot().await;
                info!(
                    "Sensors: ultrasonic={}cm battery={}V line L={} M={} R={}",
                    s.ultrasonic,
                    s.battery,
                    s.line_tracking.left,
                    s.line_tracking.middle,
                    s.line_tracking.right
                );
            }
        });
    }

    let engine = Arc::new(ExecutionEngine::new(
        transport.clone(),
        connection.clone(),
        EngineConfig {
            settle_delay: Duration::from_millis(cli.settle_ms),
        },
    ));

    let actions = match (&cli.program, cli.watch) {
        (None, true) => None,
        (source, _) => Some(read_program(source.as_ref()).await?),
    };

    if let Some(actions) = actions {
        execute(&engine, actions).await?;
    }

    if cli.watch {
        info!("Watching sensors, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    }

    connection.disconnect().await;
    Ok(())
}

/// Read and parse the program from a file or stdin
async fn read_program(path: Option<&PathBuf>) -> Result<Vec<Action>> {
    let source = match path {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading program {}", path.display()))?,
        _ => {
            let mut source = String::new();
            tokio::io::stdin()
                .read_to_string(&mut source)
                .await
                .context("reading program from stdin")?;
            source
        }
    };

    program::load_program(&source).context("loading program")
}

/// Run the program, cancelling it on Ctrl-C
async fn execute(engine: &Arc<ExecutionEngine>, actions: Vec<Action>) -> Result<()> {
    let runner = engine.clone();
    let mut run = tokio::spawn(async move { runner.run(actions).await });

    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            match engine.progress() {
                Some(p) => warn!("Ctrl-C received at action {}/{}, stopping robot", p.cursor, p.total),
                None => warn!("Ctrl-C received, stopping robot"),
            }
            if let Err(e) = engine.cancel().await {
                error!("Failed to send stop: {}", e);
            }
            run.await
        }
    };

    match result.context("execution task panicked")?? {
        RunOutcome::Completed { executed } => info!("Program finished: {} action(s)", executed),
        RunOutcome::Cancelled { executed } => info!("Program cancelled after {} action(s)", executed),
        RunOutcome::Rejected => warn!("Program rejected: a run is already active"),
    }
    Ok(())
}
