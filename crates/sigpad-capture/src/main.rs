//! SigPad capture application entry point.
//!
//! Wires the session manager and capture controller to a bridge and runs an
//! interactive operator loop on stdin:
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML config with serde defaults
//!  └─ SessionManager::connect
//!  └─ CaptureController
//!       ├─ start    -- begin a capture
//!       ├─ clear    -- wipe strokes (surface + pad display)
//!       ├─ finish   -- export the raster to disk
//!       └─ quit     -- close the bridge and exit
//! ```
//!
//! This build runs against the simulated bridge, which replays a canned
//! signature; the production transport to the real pad service is injected
//! in its place without touching the application layer.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sigpad_capture::application::{CaptureController, SessionManager};
use sigpad_capture::infrastructure::bridge::simulated::SimulatedBridge;
use sigpad_capture::infrastructure::render::RasterSurface;
use sigpad_capture::infrastructure::storage::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().unwrap_or_else(|e| {
        eprintln!("config unreadable ({e}); using defaults");
        Default::default()
    });

    // Structured logging; RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.capture.log_level.clone())),
        )
        .init();

    info!("SigPad capture starting");

    let format = config.capture.export_format()?;
    let bridge = SimulatedBridge::new();
    let mut manager = SessionManager::new(bridge, config.bridge.retry_policy());

    let session = manager.connect().await?;
    let surface = RasterSurface::new(
        config.capture.canvas_width,
        config.capture.canvas_height,
        config.capture.pen_width,
    );
    let mut controller = CaptureController::new(
        Box::new(surface),
        config.capture.canvas_width,
        config.capture.canvas_height,
        format,
    );
    controller.attach_session(session);

    let output_name = match format {
        sigpad_capture::infrastructure::render::ExportFormat::Png => "signature.png",
        sigpad_capture::infrastructure::render::ExportFormat::Jpeg { .. } => "signature.jpg",
    };

    info!("commands: start | finish | clear | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "start" => {
                        if let Err(e) = controller.start_capture().await {
                            error!("start failed: {e}");
                        } else {
                            info!("signature capture started; sign on the pad now");
                        }
                    }
                    "finish" => match controller.finish_capture().await {
                        Ok(Some(bytes)) => {
                            if let Err(e) = std::fs::write(output_name, &bytes) {
                                error!("could not write {output_name}: {e}");
                            } else {
                                info!(
                                    "signature image ready: {output_name} ({} bytes, {} segments)",
                                    bytes.len(),
                                    controller.segments_drawn()
                                );
                            }
                        }
                        Ok(None) => warn!("no active session; nothing to finish"),
                        Err(e) => error!("finish failed: {e}"),
                    },
                    "clear" => {
                        if let Err(e) = controller.clear_capture().await {
                            error!("clear failed: {e}");
                        } else {
                            info!("capture cleared");
                        }
                    }
                    "quit" | "exit" => break,
                    "" => {}
                    other => warn!("unknown command: {other:?}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    // Best-effort bridge teardown; nothing to recover at this point.
    manager.shutdown().await;
    info!("SigPad capture stopped");
    Ok(())
}
