mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::QuakeScopeApp;
use config::Config;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = Config::resolve();
    log::info!("Snapshot: {}", config.snapshot_path.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "QuakeScope: Earthquake Explorer",
        options,
        Box::new(move |_cc| Ok(Box::new(QuakeScopeApp::new(config)))),
    )
}
