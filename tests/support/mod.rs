//! 测试用的渲染引擎与保存对话框替身
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;

use patientcare::config::{PrintConfig, StageTimeouts};
use patientcare::print_pipeline::options::{PdfOptions, PrintSettings};
use patientcare::print_pipeline::printers::Printer;
use patientcare::print_pipeline::render::{RenderEngine, Surface, SurfaceKind};
use patientcare::print_pipeline::save::{SaveDialog, SaveDialogRequest};
use patientcare::{ConfigStore, MemoryStore, PrintError, PrintService, Result};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7 fake";

/// 引擎行为开关
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub fail_spawn: bool,
    pub fail_navigation: bool,
    pub hang_settle: bool,
    pub fail_pdf: bool,
    pub fail_print: bool,
    pub fail_printers: bool,
    pub printers: Vec<Printer>,
}

#[derive(Debug, Default)]
pub struct Journal {
    pub spawned: Vec<SurfaceKind>,
    pub closed: usize,
    pub double_closes: usize,
    pub navigations: Vec<Url>,
    pub loaded_html: Vec<String>,
    pub pdf_requests: Vec<PdfOptions>,
    pub print_jobs: Vec<PrintSettings>,
    pub printer_queries: usize,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    behavior: Behavior,
    journal: Arc<Mutex<Journal>>,
}

impl FakeEngine {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            journal: Arc::default(),
        }
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    /// 仍未关闭的表面数量
    pub fn live_surfaces(&self) -> usize {
        let journal = self.journal();
        journal.spawned.len() - journal.closed
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn spawn(&self, kind: SurfaceKind) -> Result<Box<dyn Surface>> {
        if self.behavior.fail_spawn {
            return Err(PrintError::Render("browser failed to launch".to_string()));
        }
        self.journal().spawned.push(kind);
        Ok(Box::new(FakeSurface {
            behavior: self.behavior.clone(),
            journal: self.journal.clone(),
            closed: false,
        }))
    }
}

struct FakeSurface {
    behavior: Behavior,
    journal: Arc<Mutex<Journal>>,
    closed: bool,
}

#[async_trait]
impl Surface for FakeSurface {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.journal.lock().unwrap().navigations.push(url.clone());
        if self.behavior.fail_navigation {
            return Err(PrintError::Render("net::ERR_FILE_NOT_FOUND".to_string()));
        }
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| PrintError::Render("bad file url".to_string()))?;
            let html = std::fs::read_to_string(path)
                .map_err(|_| PrintError::Render("net::ERR_FILE_NOT_FOUND".to_string()))?;
            self.journal.lock().unwrap().loaded_html.push(html);
        }
        Ok(())
    }

    async fn wait_settled(&mut self) -> Result<()> {
        if self.behavior.hang_settle {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn print_to_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>> {
        self.journal.lock().unwrap().pdf_requests.push(options.clone());
        if self.behavior.fail_pdf {
            return Err(PrintError::Render("printToPDF crashed".to_string()));
        }
        Ok(FAKE_PDF.to_vec())
    }

    async fn printers(&mut self) -> Result<Vec<Printer>> {
        self.journal.lock().unwrap().printer_queries += 1;
        if self.behavior.fail_printers {
            return Err(PrintError::Print("spooler unavailable".to_string()));
        }
        Ok(self.behavior.printers.clone())
    }

    async fn print(&mut self, settings: &PrintSettings) -> Result<()> {
        self.journal.lock().unwrap().print_jobs.push(settings.clone());
        if self.behavior.fail_print {
            return Err(PrintError::Render("printer offline".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut journal = self.journal.lock().unwrap();
        if self.closed {
            journal.double_closes += 1;
        } else {
            journal.closed += 1;
        }
        self.closed = true;
        Ok(())
    }
}

/// 按脚本回答的保存对话框；`None` 表示用户取消
#[derive(Default)]
pub struct ScriptedDialog {
    answer: Option<PathBuf>,
    pub requests: Mutex<Vec<SaveDialogRequest>>,
}

impl ScriptedDialog {
    pub fn choosing(path: impl Into<PathBuf>) -> Self {
        Self {
            answer: Some(path.into()),
            requests: Mutex::default(),
        }
    }

    pub fn canceling() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SaveDialog for ScriptedDialog {
    async fn pick(&self, request: SaveDialogRequest) -> Result<Option<PathBuf>> {
        self.requests.lock().unwrap().push(request);
        Ok(self.answer.clone())
    }
}

/// 一个测试场景：服务及其所有协作者
pub struct Harness {
    pub engine: FakeEngine,
    pub dialog: Arc<ScriptedDialog>,
    pub store: Arc<MemoryStore>,
    pub service: PrintService,
    pub workdir: tempfile::TempDir,
}

impl Harness {
    pub fn new(behavior: Behavior, dialog: ScriptedDialog) -> Self {
        Self::with_store(behavior, dialog, MemoryStore::new())
    }

    pub fn with_store(behavior: Behavior, dialog: ScriptedDialog, store: MemoryStore) -> Self {
        let workdir = tempfile::tempdir().unwrap();
        let config = PrintConfig {
            export_temp_dir: workdir.path().join("export"),
            print_temp_dir: workdir.path().join("resources").join("temp"),
            timeouts: StageTimeouts {
                spawn_ms: 500,
                load_ms: 500,
                settle_ms: 100,
                convert_ms: 500,
                print_ms: 500,
                dialog_print_ms: 500,
                enumerate_ms: 500,
            },
            ..PrintConfig::default()
        };

        let engine = FakeEngine::new(behavior);
        let dialog = Arc::new(dialog);
        let store = Arc::new(store);
        let service = PrintService::new(
            Arc::new(engine.clone()),
            store.clone() as Arc<dyn ConfigStore>,
            dialog.clone() as Arc<dyn SaveDialog>,
            config,
        );

        Self {
            engine,
            dialog,
            store,
            service,
            workdir,
        }
    }

    /// 导出与打印工作目录中残留的临时文件
    pub fn leftover_artifacts(&self) -> usize {
        let config = self.service.config();
        count_files(&config.export_temp_dir) + count_files(&config.print_temp_dir)
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().count())
        .unwrap_or(0)
}
