//! Renewable Energy Dashboard - interactive analysis of renewable capacity
//! and generation data.

use eframe::egui;
use renewable_dashboard::config::DashboardConfig;
use renewable_dashboard::gui::DashboardApp;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::load();
    log::info!(
        "Starting dashboard ({}x{} window)",
        config.window.width,
        config.window.height
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Renewable Energy Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Renewable Energy Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start the dashboard: {}", e))
}
