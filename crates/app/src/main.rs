//! PDF stamper entry point.

use anyhow::Context as _;
use eframe::egui;
use pdf_stamper::{default_rasterizer, StamperApp, StamperConfig};
use stamp_engine::StampEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StamperConfig::from_env();
    let engine = StampEngine::new(default_rasterizer(), config.scale());
    tracing::info!(renderer = engine.rasterizer_name(), scale = config.display_scale, "starting");

    let initial_file = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 900.0])
            .with_title("PDF Multi-Tool"),
        ..Default::default()
    };

    eframe::run_native(
        "PDF Multi-Tool",
        options,
        Box::new(move |cc| Ok(Box::new(StamperApp::new(cc, engine, &config, initial_file)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("failed to run the window")
}
