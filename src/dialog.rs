use async_trait::async_trait;
use std::path::PathBuf;
use tauri::{AppHandle, Runtime};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

use crate::error::{PrintError, Result};
use crate::print_pipeline::save::{SaveDialog, SaveDialogRequest};

/// 使用 tauri-plugin-dialog 的原生保存对话框
pub struct TauriSaveDialog<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriSaveDialog<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

#[async_trait]
impl<R: Runtime> SaveDialog for TauriSaveDialog<R> {
    async fn pick(&self, request: SaveDialogRequest) -> Result<Option<PathBuf>> {
        let (tx, rx) = oneshot::channel();

        self.app
            .dialog()
            .file()
            .add_filter("PDF", &[request.extension])
            .set_directory(&request.directory)
            .set_file_name(request.file_name.clone())
            .set_can_create_directories(request.can_create_directories)
            .save_file(move |picked| {
                let _ = tx.send(picked);
            });

        let picked = rx
            .await
            .map_err(|_| PrintError::Dialog("save dialog closed without a response".to_string()))?;

        picked
            .map(|path| path.into_path().map_err(|e| PrintError::Dialog(e.to_string())))
            .transpose()
    }
}
