#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Meme Studio",
        native_options,
        Box::new(|cc| Ok(Box::new(meme_studio::StudioApp::new(cc)))),
    )
}
