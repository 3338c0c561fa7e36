//! Luma viewer entry point.
//!
//! ```text
//! luma-viewer                      Connect with defaults
//! luma-viewer --url <ws://...>     Override the stream endpoint
//! luma-viewer --config <path>      Use custom config TOML
//! luma-viewer --gen-config         Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

use luma_core::{FrameQueue, StreamEvent, StreamIngestor};
use luma_viewer::app::ViewerApp;
use luma_viewer::config::ViewerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "luma-viewer", about = "Live YUV420p stream viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "luma-viewer.toml")]
    config: PathBuf,

    /// Stream endpoint (overrides config). Example: ws://127.0.0.1:9000/ws/live
    #[arg(short, long)]
    url: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(url) = cli.url {
        config.network.url = url;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("luma-viewer v{}", env!("CARGO_PKG_VERSION"));

    // The queue is the single shared hand-off point between the
    // ingest task and the render loop.
    let queue = Arc::new(FrameQueue::new());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    // winit owns the main thread; network I/O runs on tokio workers.
    let event_loop = EventLoop::<StreamEvent>::with_user_event().build()?;
    let proxy = event_loop.create_proxy();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // ── 1. Ingest task ──────────────────────────────────────────

    let url = config.network.url.clone();
    let ingest_queue = Arc::clone(&queue);
    let ingest_events = event_tx.clone();
    runtime.spawn(async move {
        match StreamIngestor::connect(&url, ingest_queue, event_tx).await {
            Ok(ingestor) => {
                // run() reports Closed on its own; the error return
                // is for embedders, already logged here.
                if let Err(e) = ingestor.run().await {
                    error!(error = %e, "stream terminated");
                }
            }
            Err(e) => {
                error!(error = %e, "connection failed");
                let _ = ingest_events.send(StreamEvent::Closed(Some(e.to_string())));
            }
        }
    });

    // ── 2. Event bridge: tokio → winit ──────────────────────────

    runtime.spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if proxy.send_event(event).is_err() {
                break; // event loop is gone
            }
        }
    });

    // ── 3. Window + render loop ─────────────────────────────────

    let mut app = ViewerApp::new(config.display, queue);
    event_loop.run_app(&mut app)?;

    info!("shutting down");
    Ok(())
}
