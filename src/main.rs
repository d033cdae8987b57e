//! Content Capture - session replay
//!
//! Replays a recorded session file and prints every captured record as one
//! JSON line on stdout.

use content_capture::{replay, Config, Session};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

const USAGE: &str = "usage: content-capture <session.json> [--config <path>]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut session_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = Some(args.next().ok_or(USAGE)?.into());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ if session_path.is_none() => session_path = Some(arg.into()),
            _ => return Err(USAGE.into()),
        }
    }
    let session_path = session_path.ok_or(USAGE)?;

    // Initialize logging on stderr first so config loading is logged;
    // stdout carries the captures
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match &config_path {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    if !filter_from_env {
        filter_handle.modify(|filter| *filter = EnvFilter::new(&config.general.log_level))?;
    }

    info!(
        "Configuration loaded from {:?}",
        config_path.unwrap_or_else(Config::default_config_path)
    );

    let session = Session::load(&session_path)?;
    let captured = replay(session, &config)?;

    for content in &captured {
        println!("{}", serde_json::to_string(content)?);
    }

    info!("Replay finished: {} captures", captured.len());
    Ok(())
}
