use eframe::{egui, NativeOptions};

mod compiler;
mod playground;
mod screens;
mod ui_components;
mod utils;

const APP_NAME: &str = "Shader Playground";
const WINDOW_W: f32 = 1600.0;
const WINDOW_H: f32 = 960.0;

fn main() -> Result<(), eframe::Error> {
    // RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("naga", log::LevelFilter::Warn)
        .init();

    log::info!("[Main] Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let native_options = NativeOptions {
        renderer: eframe::Renderer::Wgpu,
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_NAME)
            .with_inner_size([WINDOW_W, WINDOW_H]),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(screens::playground::PlaygroundApp::new(cc)))),
    )
}
