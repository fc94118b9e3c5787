use serde_json::{Map, Value};
use tauri::State;

use super::PrintState;
use crate::error::PrintError;
use crate::print_pipeline::{ExportRequest, SaveResult};

/// 导出 PDF（`export-pdf`）：渲染模板，弹出保存对话框并写出文件
///
/// 失败和取消都体现在 `SaveResult` 中，命令本身不会返回错误。
#[tauri::command]
pub async fn export_pdf(
    state: State<'_, PrintState>,
    template: Option<String>,
    config: Option<Map<String, Value>>,
) -> Result<SaveResult, PrintError> {
    let request = ExportRequest {
        template_html: template,
        pdf_options: config.unwrap_or_default(),
    };
    Ok(state.service.export_pdf(request).await)
}
