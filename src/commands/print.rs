use serde_json::{Map, Value};
use tauri::State;

use super::PrintState;
use crate::error::PrintError;
use crate::print_pipeline::printers::Printer;
use crate::print_pipeline::PrintOutcome;

/// 列出系统打印机（`print-load-printers`），失败时为空列表
#[tauri::command]
pub async fn print_load_printers(state: State<'_, PrintState>) -> Result<Vec<Printer>, PrintError> {
    Ok(state.service.load_printers().await)
}

/// 静默打印到指定打印机（`print-silent`）
#[tauri::command]
pub async fn print_silent(
    state: State<'_, PrintState>,
    template: Option<String>,
    printer: Option<String>,
    config: Option<Map<String, Value>>,
) -> Result<PrintOutcome, PrintError> {
    Ok(state
        .service
        .print_silent(template, printer, config.unwrap_or_default())
        .await)
}

/// 弹出系统打印对话框（`print-not-silent`）
#[tauri::command]
pub async fn print_not_silent(
    state: State<'_, PrintState>,
    template: Option<String>,
    config: Option<Map<String, Value>>,
) -> Result<PrintOutcome, PrintError> {
    Ok(state
        .service
        .print_interactive(template, config.unwrap_or_default())
        .await)
}
