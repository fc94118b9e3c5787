//! 文档导出与打印管线
//!
//! 每个请求：写入 HTML 临时文件 → 离屏表面加载并稳定 → 转换为 PDF 或发送到打印机
//! → 无论成功、取消还是出错，都销毁表面并删除临时文件。所有阶段的错误都在
//! [`PrintService`] 的请求边界被转换为结构化响应，不会继续向外抛出。

pub mod dispatch;
pub mod options;
pub mod pdf;
pub mod printers;
pub mod render;
pub mod save;
pub mod temp;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

use crate::config::PrintConfig;
use crate::error::{PrintError, Result};
use crate::store::ConfigStore;
use options::{PdfOptions, PrintSettings};
use printers::Printer;
use render::{OffscreenSurface, RenderEngine, SurfaceKind};
use save::{SaveDestination, SaveDestinationResolver, SaveDialog};
use temp::{TempArtifact, TempArtifactManager};

#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub template_html: Option<String>,
    pub pdf_options: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct PrintRequest {
    pub template_html: Option<String>,
    pub printer_name: Option<String>,
    pub print_options: Map<String, Value>,
    pub silent: bool,
}

/// `export-pdf` 的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResult {
    pub fn saved(path: &Path) -> Self {
        Self {
            success: true,
            canceled: None,
            path: Some(path.to_string_lossy().to_string()),
            error: None,
        }
    }

    pub fn canceled() -> Self {
        Self {
            success: false,
            canceled: Some(true),
            path: None,
            error: None,
        }
    }

    pub fn failed(error: &PrintError) -> Self {
        Self {
            success: false,
            canceled: None,
            path: None,
            error: Some(error.to_string()),
        }
    }
}

/// `print-silent` / `print-not-silent` 的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: &PrintError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

pub struct PrintService {
    engine: Arc<dyn RenderEngine>,
    store: Arc<dyn ConfigStore>,
    dialog: Arc<dyn SaveDialog>,
    config: PrintConfig,
    export_artifacts: TempArtifactManager,
    print_artifacts: TempArtifactManager,
}

impl PrintService {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        store: Arc<dyn ConfigStore>,
        dialog: Arc<dyn SaveDialog>,
        config: PrintConfig,
    ) -> Self {
        let export_artifacts = TempArtifactManager::for_export(&config.export_temp_dir);
        let print_artifacts = TempArtifactManager::for_print(&config.print_temp_dir);
        Self {
            engine,
            store,
            dialog,
            config,
            export_artifacts,
            print_artifacts,
        }
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// 渲染模板、询问保存位置并写出 PDF
    pub async fn export_pdf(&self, request: ExportRequest) -> SaveResult {
        let span = tracing::info_span!("export_pdf", request = %uuid::Uuid::new_v4());
        async {
            match self.try_export_pdf(request).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "export failed");
                    SaveResult::failed(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// 列出系统打印机；失败时返回空列表
    pub async fn load_printers(&self) -> Vec<Printer> {
        let span = tracing::info_span!("load_printers");
        printers::list(self.engine.as_ref(), self.config.timeouts)
            .instrument(span)
            .await
    }

    /// 不弹对话框，直接发送到指定打印机
    pub async fn print_silent(
        &self,
        template_html: Option<String>,
        printer_name: Option<String>,
        print_options: Map<String, Value>,
    ) -> PrintOutcome {
        self.print(PrintRequest {
            template_html,
            printer_name,
            print_options,
            silent: true,
        })
        .await
    }

    /// 弹出系统打印对话框，由用户选择打印机
    pub async fn print_interactive(
        &self,
        template_html: Option<String>,
        print_options: Map<String, Value>,
    ) -> PrintOutcome {
        self.print(PrintRequest {
            template_html,
            printer_name: None,
            print_options,
            silent: false,
        })
        .await
    }

    pub async fn print(&self, request: PrintRequest) -> PrintOutcome {
        let span = tracing::info_span!(
            "print",
            request = %uuid::Uuid::new_v4(),
            silent = request.silent
        );
        async {
            match self.try_print(request).await {
                Ok(()) => PrintOutcome::ok(),
                Err(e) => {
                    tracing::error!(error = %e, "print failed");
                    PrintOutcome::failed(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_export_pdf(&self, request: ExportRequest) -> Result<SaveResult> {
        let template = require_template(request.template_html.as_deref())?;
        let options = PdfOptions::from_overrides(&request.pdf_options)?;

        let artifact = self.export_artifacts.create(template).await?;
        let rendered = self.render_pdf(&artifact, &options).await;
        artifact.destroy().await;
        let pdf = rendered?;

        let resolver = SaveDestinationResolver::new(self.store.clone(), self.dialog.clone());
        let path = match resolver
            .resolve(None, &self.config.default_file_name)
            .await?
        {
            SaveDestination::Canceled => {
                tracing::info!("save canceled by user");
                return Ok(SaveResult::canceled());
            }
            SaveDestination::Chosen(path) => path,
        };

        tokio::fs::write(&path, &pdf)
            .await
            .map_err(|e| PrintError::filesystem(format!("Failed to write {}", path.display()), e))?;

        // 只影响下次对话框的默认目录，记录失败不影响本次保存
        let saved = path.clone();
        match tokio::task::spawn_blocking(move || resolver.remember(&saved)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to remember save directory"),
            Err(e) => tracing::warn!(error = %e, "remember task failed"),
        }

        tracing::info!(path = %path.display(), size = pdf.len(), "PDF saved");
        Ok(SaveResult::saved(&path))
    }

    async fn try_print(&self, request: PrintRequest) -> Result<()> {
        let template = require_template(request.template_html.as_deref())?;
        let printer = request
            .printer_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        // 调用方选项最后展开，可能改写 silent 与 deviceName，检查合并后的结果
        let settings =
            PrintSettings::from_overrides(request.silent, printer, &request.print_options)?;
        settings.require_printer()?;

        let kind = if settings.silent {
            SurfaceKind::Offscreen
        } else {
            SurfaceKind::Dialog
        };

        let artifact = self.print_artifacts.create(template).await?;
        let printed = self.render_and_print(&artifact, kind, &settings).await;
        artifact.destroy().await;
        printed
    }

    async fn render_pdf(&self, artifact: &TempArtifact, options: &PdfOptions) -> Result<Vec<u8>> {
        let mut surface = OffscreenSurface::spawn(
            self.engine.as_ref(),
            SurfaceKind::Offscreen,
            self.config.timeouts,
        )
        .await?;

        let result: Result<Vec<u8>> = async {
            surface.load(&artifact.file_url()?).await?;
            pdf::to_pdf(&mut surface, options).await
        }
        .await;

        surface.destroy();
        result
    }

    async fn render_and_print(
        &self,
        artifact: &TempArtifact,
        kind: SurfaceKind,
        settings: &PrintSettings,
    ) -> Result<()> {
        let mut surface =
            OffscreenSurface::spawn(self.engine.as_ref(), kind, self.config.timeouts).await?;

        let result: Result<()> = async {
            surface.load(&artifact.file_url()?).await?;
            dispatch::print(&mut surface, settings).await
        }
        .await;

        surface.destroy();
        result
    }
}

fn require_template(template: Option<&str>) -> Result<&str> {
    match template {
        Some(html) if !html.trim().is_empty() => Ok(html),
        _ => Err(PrintError::MissingInput("template")),
    }
}
