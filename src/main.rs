// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use patientcare::chrome::ChromeEngine;
use patientcare::commands::{
    export::*,
    print::*,
    PrintState,
};
use patientcare::dialog::TauriSaveDialog;
use patientcare::{logging, JsonFileStore, PrintConfig, PrintService};
use std::path::PathBuf;
use std::sync::Arc;
use tauri::Manager;

fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let handle = app.handle();
            let config_dir = handle
                .path()
                .app_config_dir()
                .unwrap_or_else(|_| PathBuf::from("."));

            let config = PrintConfig::load(&config_dir)?;

            if let Err(e) = logging::init(&config.logging) {
                eprintln!("[Logging] 初始化失败: {}", e);
            }

            let store = JsonFileStore::open(config_dir.join("config.json"))?;
            tracing::info!(store = %store.path().display(), "config store opened");

            let service = PrintService::new(
                Arc::new(ChromeEngine::new(&config)),
                Arc::new(store),
                Arc::new(TauriSaveDialog::new(handle.clone())),
                config,
            );
            app.manage(PrintState { service });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Export commands
            export_pdf,

            // Print commands
            print_load_printers,
            print_silent,
            print_not_silent,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
