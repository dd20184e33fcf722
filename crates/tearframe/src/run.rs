use anyhow::{Context, Result};
use renderer::{RendererConfig, WindowRuntime};
use tracing_subscriber::EnvFilter;

use crate::assets::load_scene_images;
use crate::cli::Cli;
use crate::config::AppConfig;

pub fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::resolve(&cli).context("failed to resolve settings")?;
    tracing::debug!(
        frame = %config.frame,
        photo = %config.photo,
        size = ?config.surface_size,
        policy = ?config.policy,
        fetch_timeout = ?config.fetch_timeout,
        "resolved tearframe settings"
    );

    let images = load_scene_images(&config.frame, &config.photo, config.fetch_timeout)?;

    let mut renderer_config = RendererConfig::new(images);
    renderer_config.surface_size = config.surface_size;
    renderer_config.antialiasing = config.antialiasing;
    renderer_config.color_space = config.color_space;
    renderer_config.policy = config.policy;

    let runtime = WindowRuntime::spawn(renderer_config)?;
    if let Some(limit) = config.run_for {
        tracing::info!(?limit, "window closes automatically after the run limit");
    }
    runtime.wait(config.run_for)
}

pub fn initialise_tracing() {
    let default_filter = "warn,tearframe=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
