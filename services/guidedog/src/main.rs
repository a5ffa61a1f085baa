use anyhow::{Context, Result};
use clap::Parser;
use guidedog_core::monitor::HazardMonitor;
use guidedog_core::navigator::Navigator;
use guidedog_core::{Command, now_ms};
use guidedog_service::assistant::Assistant;
use guidedog_service::camera::DirectoryCamera;
use guidedog_service::config::Config;
use guidedog_service::directions_client::GoogleDirectionsClient;
use guidedog_service::output::ConsoleOutput;
use guidedog_service::prompt_loader::Prompts;
use guidedog_service::vision_client;
use guidedog_service::voice::InputLine;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Reads voice transcripts and `fix <lat> <lng> [heading]` / `heading <deg>`
/// lines from stdin and speaks alerts to stdout.
#[derive(Parser)]
struct Cli {
    /// Directory of still frames played back as the camera feed
    #[arg(long)]
    frames: PathBuf,
    /// Directory holding the vision prompt templates
    #[arg(long, default_value = "prompts")]
    prompts: PathBuf,
    /// Start hazard monitoring immediately
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    tracing::info!("Configuration loaded, vision provider {:?}", config.vision_provider);

    let prompts = Prompts::load(&args.prompts).context("Failed to load vision prompts")?;
    tracing::info!("Loaded {} prompts", prompts.len());
    let analyzer = vision_client::from_config(&config, prompts);

    let (command_tx, command_rx) = tokio::sync::mpsc::channel::<Command>(64);
    let output = tokio::spawn(ConsoleOutput::new(std::io::stdout()).run(command_rx));

    let camera = Arc::new(DirectoryCamera::new(&args.frames));
    let monitor = HazardMonitor::new(camera, analyzer, command_tx.clone())
        .with_interval(config.hazard_interval);

    let navigator = match &config.maps_api_key {
        Some(key) => Some(Navigator::new(
            Arc::new(GoogleDirectionsClient::new(key.clone())),
            command_tx.clone(),
        )),
        None => {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set, navigation disabled");
            None
        }
    };

    let assistant = Arc::new(Assistant::new(monitor, navigator, command_tx));
    if args.monitor {
        assistant.handle_voice("start monitoring").await;
    }

    let input = {
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match InputLine::parse(&line, now_ms()) {
                    InputLine::Voice(text) => {
                        // analysis can take seconds; keep fixes flowing meanwhile
                        let assistant = Arc::clone(&assistant);
                        tokio::spawn(async move { assistant.handle_voice(&text).await });
                    }
                    other => assistant.handle_line(other).await,
                }
            }
            tracing::info!("Input closed");
        })
    };

    tokio::select! {
        _ = input => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    assistant.shutdown();
    drop(assistant);
    // let queued speech drain once the last sender is gone
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), output).await;
    tracing::info!("Shutting down...");
    Ok(())
}
