mod bluetooth;
mod config;
mod control;
mod display;
mod error;
mod mapping;
mod models;
mod sampler;
mod session;
mod utils;

use crossterm::event::EventStream;
use log::{error, info, warn};
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::sleep;

use bluetooth::{list_paired_devices, open_default_adapter, select_device, ConnectionHandle};
use config::{log_file_path, PainterConfig};
use control::{run_key_controls, Controls, RangeControl};
use display::{CanvasSize, ImmersiveTerminal, StatusLine, TerminalDisplay};
use error::PainterError;
use models::SignalRange;
use sampler::{Sampler, SamplerSettings};
use session::{LinkEvent, LinkState};
use utils::{format_timestamp, summarize_session};

type Canvas = TerminalDisplay<io::Stdout>;

/// Sample the connected peripheral until it drops the link, then hand the canvas back
async fn paint_until_disconnected(
    handle: ConnectionHandle,
    range: watch::Receiver<SignalRange>,
    canvas: Canvas,
    settings: SamplerSettings,
) -> Result<Canvas, PainterError> {
    let handle = Arc::new(handle);
    let started = OffsetDateTime::now_utc();
    info!(
        "Painting session with {} started at {}",
        handle.address(),
        format_timestamp(&started)
    );

    let sampler = Sampler::start(handle.clone(), range, canvas, settings);

    if let Err(e) = handle.wait_for_disconnect().await {
        warn!("Lost track of the connection state: {}", e);
        handle.close();
    }

    let (canvas, report) = sampler.stop().await?;
    let ended = OffsetDateTime::now_utc();
    info!(
        "Painting session ended at {}: {}",
        format_timestamp(&ended),
        summarize_session(&report, ended - started)
    );

    Ok(canvas)
}

async fn main_loop(
    config: PainterConfig,
    range: watch::Receiver<SignalRange>,
    mut canvas: Canvas,
    status: StatusLine,
) -> Result<(), PainterError> {
    info!("Starting RSSI light painter");

    let (_session, adapter) = open_default_adapter().await?;
    let devices = list_paired_devices(&adapter).await?;
    let target = select_device(&devices, config.device.as_deref())?.clone();
    info!("Selected {}", target);

    let mut link = LinkState::start();
    loop {
        let attempt = match link {
            LinkState::GaveUp { attempts } => {
                return Err(PainterError::ConnectFailed {
                    address: target.address.clone(),
                    attempts,
                })
            }
            state => state.attempt().unwrap_or(1),
        };
        status.set(format!("Connecting to {} (attempt {})", target, attempt));
        canvas.refresh();

        match ConnectionHandle::open(&adapter, &target).await {
            Ok(handle) => {
                link = link.next(LinkEvent::Connected, config.connect_attempts);
                info!("Connected to {} on attempt {}", target, attempt);
                status.set(format!("Painting {}", target));

                canvas = paint_until_disconnected(handle, range.clone(), canvas, config.sampler)
                    .await?;

                warn!("Connection to {} lost, reconnecting", target);
                status.set(format!("Connection to {} lost, reconnecting", target));
                link = link.next(LinkEvent::ConnectionLost, config.connect_attempts);
            }
            Err(e) => {
                error!("Attempt {}: failed to connect to {}: {}", attempt, target, e);
                status.set(format!("Attempt {} failed: {}", attempt, e));
                canvas.refresh();
                link = link.next(LinkEvent::ConnectFailed, config.connect_attempts);

                if !matches!(link, LinkState::GaveUp { .. }) {
                    sleep(config.reconnect_delay).await;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; the terminal belongs to the canvas, so logs go to a file
    dotenv::dotenv().ok();
    let log_path = log_file_path(|key| env::var(key).ok());
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    // Load configuration
    let config = match PainterConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let status = StatusLine::new();
    let controls = Controls::new(
        RangeControl::new(config.range)?,
        config.brush,
        CanvasSize::of_terminal(),
        status.clone(),
    );
    let canvas = TerminalDisplay::new(
        io::stdout(),
        controls.subscribe_brush(),
        controls.subscribe_canvas(),
        status.subscribe(),
    );
    let range = controls.range.subscribe();

    // Restored when this guard drops, on every way out of main
    let _terminal = ImmersiveTerminal::enter()?;

    // Run main loop until it fails, the user quits, or a shutdown signal arrives
    tokio::select! {
        result = main_loop(config, range, canvas, status) => {
            if let Err(e) = result {
                error!("Fatal error: {}", e);
                return Err(e.into());
            }
        }
        result = run_key_controls(&controls, EventStream::new()) => {
            if let Err(e) = result {
                error!("Keyboard controls failed: {}", e);
                return Err(e.into());
            }
            info!("Painting stopped by user. Exiting gracefully.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Painting stopped by signal. Exiting gracefully.");
        }
    }

    Ok(())
}
