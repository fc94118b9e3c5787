//! 基于 headless Chrome 的渲染引擎
//!
//! 每个表面启动独立的浏览器进程，关闭表面即结束该进程。`headless_chrome`
//! 的调用都是阻塞的，统一放到 `spawn_blocking` 中执行。

pub mod spooler;

use async_trait::async_trait;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::cmp::max;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{PrintConfig, StageTimeouts};
use crate::error::{PrintError, Result};
use crate::print_pipeline::options::{PdfOptions, PrintSettings};
use crate::print_pipeline::printers::Printer;
use crate::print_pipeline::render::{RenderEngine, Surface, SurfaceKind};
use spooler::SystemSpooler;

/// 文档加载完成、字体就绪并且又绘制了两帧之后才 resolve
const SETTLE_SCRIPT: &str = r#"
new Promise((resolve) => {
  const frames = () => requestAnimationFrame(() => requestAnimationFrame(() => resolve(true)));
  const fonts = () => (document.fonts ? document.fonts.ready : Promise.resolve()).then(frames);
  if (document.readyState === 'complete') {
    fonts();
  } else {
    window.addEventListener('load', fonts, { once: true });
  }
})
"#;

pub struct ChromeEngine {
    chrome_path: Option<PathBuf>,
    window_size: (u32, u32),
    timeouts: StageTimeouts,
    spooler: SystemSpooler,
}

impl ChromeEngine {
    pub fn new(config: &PrintConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            window_size: (config.window_width, config.window_height),
            timeouts: config.timeouts,
            spooler: SystemSpooler::new(),
        }
    }

    /// 浏览器端的超时要覆盖最长的单个阶段，真正的期限由管线控制
    fn longest_stage(&self) -> Duration {
        let t = &self.timeouts;
        [t.load(), t.settle(), t.convert(), t.print(true), t.print(false), t.enumerate()]
            .into_iter()
            .fold(Duration::from_secs(30), max)
    }

    fn launch_options(&self, kind: SurfaceKind) -> Result<LaunchOptions<'static>> {
        let args: Vec<&'static OsStr> = match kind {
            SurfaceKind::Offscreen => Vec::new(),
            // 系统打印对话框而不是 Chrome 预览，窗口本身放在屏幕外
            SurfaceKind::Dialog => vec![
                OsStr::new("--disable-print-preview"),
                OsStr::new("--window-position=-32000,-32000"),
            ],
        };

        LaunchOptions::default_builder()
            .headless(kind == SurfaceKind::Offscreen)
            .window_size(Some(self.window_size))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(self.longest_stage())
            .args(args)
            .build()
            .map_err(|e| PrintError::Render(format!("Invalid browser launch options: {}", e)))
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    async fn spawn(&self, kind: SurfaceKind) -> Result<Box<dyn Surface>> {
        let options = self.launch_options(kind)?;
        let tab_timeout = self.longest_stage();

        let (browser, tab) = blocking(move || {
            let browser = Browser::new(options).map_err(|e| e.to_string())?;
            let tab = browser.new_tab().map_err(|e| e.to_string())?;
            tab.set_default_timeout(tab_timeout);
            Ok((browser, tab))
        })
        .await?;

        Ok(Box::new(ChromeSurface {
            browser: Some(browser),
            tab,
            kind,
            spooler: self.spooler.clone(),
        }))
    }
}

struct ChromeSurface {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    kind: SurfaceKind,
    spooler: SystemSpooler,
}

impl ChromeSurface {
    fn tab(&self) -> Result<Arc<Tab>> {
        if self.browser.is_none() {
            return Err(PrintError::Render("browser already closed".to_string()));
        }
        Ok(self.tab.clone())
    }
}

#[async_trait]
impl Surface for ChromeSurface {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        let tab = self.tab()?;
        let target = url.to_string();
        blocking(move || {
            tab.navigate_to(&target).map_err(|e| e.to_string())?;
            tab.wait_until_navigated().map_err(|e| e.to_string())?;
            Ok(())
        })
        .await
    }

    async fn wait_settled(&mut self) -> Result<()> {
        let tab = self.tab()?;
        let settled = blocking(move || {
            tab.evaluate(SETTLE_SCRIPT, true)
                .map(|remote| remote.value)
                .map_err(|e| e.to_string())
        })
        .await?;

        match settled {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            other => Err(PrintError::Render(format!(
                "document did not settle (got {:?})",
                other
            ))),
        }
    }

    async fn print_to_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>> {
        let tab = self.tab()?;
        let request = pdf_request(options)?;
        blocking(move || tab.print_to_pdf(Some(request)).map_err(|e| e.to_string()))
            .await
            .map_err(|e| match e {
                PrintError::Render(msg) => PrintError::Conversion(msg),
                other => other,
            })
    }

    async fn printers(&mut self) -> Result<Vec<Printer>> {
        self.spooler.printers().await
    }

    async fn print(&mut self, settings: &PrintSettings) -> Result<()> {
        if settings.silent {
            let printer = settings
                .device_name
                .clone()
                .ok_or(PrintError::MissingInput("printer"))?;
            let pdf = self.print_to_pdf(&settings.pdf_options()).await?;
            return self.spooler.submit(&printer, &pdf, settings).await;
        }

        if self.kind != SurfaceKind::Dialog {
            return Err(PrintError::Print(
                "interactive printing needs a dialog-capable surface".to_string(),
            ));
        }
        if let Some(printer) = &settings.device_name {
            tracing::debug!(printer = %printer, "printer preselection is left to the system dialog");
        }

        // window.print() 在对话框关闭后才返回
        let tab = self.tab()?;
        blocking(move || {
            tab.evaluate("window.print()", false)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| match e {
            PrintError::Render(msg) => PrintError::Print(msg),
            other => other,
        })
    }

    fn close(&mut self) -> Result<()> {
        // 丢弃 Browser 会结束浏览器进程
        self.browser.take();
        Ok(())
    }
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| PrintError::Render(format!("render task aborted: {}", e)))?
        .map_err(PrintError::Render)
}

/// 把版式配置翻译为 DevTools 的 `Page.printToPDF` 参数（单位英寸）
pub fn pdf_request(options: &PdfOptions) -> Result<PrintToPdfOptions> {
    options.validate()?;
    let (width, height) = options.page_size.inches()?;
    let margins = options.margins.unwrap_or_default();

    Ok(PrintToPdfOptions {
        landscape: Some(options.landscape),
        display_header_footer: Some(options.display_header_footer),
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: margins.top,
        margin_bottom: margins.bottom,
        margin_left: margins.left,
        margin_right: margins.right,
        page_ranges: options.page_ranges.clone(),
        header_template: options.header_template.clone(),
        footer_template: options.footer_template.clone(),
        prefer_css_page_size: Some(options.prefer_css_page_size),
        ..PrintToPdfOptions::default()
    })
}
