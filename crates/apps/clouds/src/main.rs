//! Volumetric cloud viewer
//!
//! Deferred-shaded demo scene under a compute-generated cloud layer.
//! Use `--config <path>` to load a RON startup configuration and
//! `--software <path>` to render one frame on the CPU without a window.

use anyhow::Context as _;
use app::{cli::CommonArgs, run_app, AppConfig};
use clap::Parser;
use clouds::{render_software, CloudsApp};
use renderer::RendererConfig;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

/// Volumetric cloud viewer
#[derive(Parser)]
#[command(name = "clouds")]
#[command(about = "Real-time ray-marched clouds over a deferred-shaded scene")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Window or image width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window or image height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Render a single frame with the CPU renderer to this PNG and exit
    #[arg(long, value_name = "PATH")]
    software: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clouds={0},renderer={0},app={0}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match args.common.config_path() {
        Some(path) => RendererConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RendererConfig::default(),
    };

    if let Some(path) = &args.software {
        tracing::info!("Rendering {}x{} on the CPU", args.width, args.height);
        return render_software(&config, args.width, args.height, path);
    }

    if let Some(frames) = args.common.debug {
        tracing::info!("Debug mode: running {} frames", frames);
    }

    let app_config = args
        .common
        .apply_to(AppConfig::new("Clouds").with_size(args.width, args.height));
    run_app(CloudsApp::new(config), app_config)
}
