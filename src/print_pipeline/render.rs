//! 离屏渲染宿主
//!
//! 每个请求独占一个 [`OffscreenSurface`]，绝不共享或复用。表面按
//! `Created → Loading → Settled → Consumed → Destroyed` 推进，导航失败进入
//! `Failed`，但仍然必须到达 `Destroyed`。`destroy` 是幂等的，`Drop` 兜底。

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

use super::options::{PdfOptions, PrintSettings};
use super::printers::Printer;
use crate::config::StageTimeouts;
use crate::error::{PrintError, Result, Stage};

/// 表面的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// 无界面渲染，用于 PDF 转换、静默打印和打印机枚举
    Offscreen,
    /// 不显示文档，但能弹出系统打印对话框
    Dialog,
}

/// 渲染后端提供的单个文档宿主
#[async_trait]
pub trait Surface: Send {
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// 等待文档在视觉上稳定（加载完成、字体就绪、布局绘制完毕）
    async fn wait_settled(&mut self) -> Result<()>;

    async fn print_to_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>>;

    async fn printers(&mut self) -> Result<Vec<Printer>>;

    async fn print(&mut self, settings: &PrintSettings) -> Result<()>;

    /// 立即释放宿主持有的全部资源
    fn close(&mut self) -> Result<()>;
}

/// 为每个请求创建新的渲染表面
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn spawn(&self, kind: SurfaceKind) -> Result<Box<dyn Surface>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Created,
    Loading,
    Settled,
    Consumed,
    Failed,
    Destroyed,
}

/// 为挂起点加上超时，超时转换为 `RenderTimeout`
pub async fn bounded<T>(
    stage: Stage,
    after: Duration,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, operation).await {
        Ok(result) => result,
        Err(_) => Err(PrintError::RenderTimeout { stage, after }),
    }
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

pub struct OffscreenSurface {
    id: u64,
    kind: SurfaceKind,
    inner: Box<dyn Surface>,
    state: SurfaceState,
    timeouts: StageTimeouts,
}

impl OffscreenSurface {
    pub async fn spawn(
        engine: &dyn RenderEngine,
        kind: SurfaceKind,
        timeouts: StageTimeouts,
    ) -> Result<Self> {
        let inner = bounded(Stage::Spawn, timeouts.spawn(), engine.spawn(kind)).await?;
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(surface = id, ?kind, "render surface created");
        Ok(Self {
            id,
            kind,
            inner,
            state: SurfaceState::Created,
            timeouts,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn timeouts(&self) -> StageTimeouts {
        self.timeouts
    }

    /// 导航到 `url` 并等待稳定；任一步失败都把表面置为 `Failed`
    pub async fn load(&mut self, url: &Url) -> Result<()> {
        if self.state != SurfaceState::Created {
            return Err(PrintError::Render(format!(
                "surface {} cannot load in state {:?}",
                self.id, self.state
            )));
        }

        self.state = SurfaceState::Loading;
        tracing::debug!(surface = self.id, %url, "loading document");

        let loaded = bounded(Stage::Load, self.timeouts.load(), self.inner.navigate(url)).await;
        if let Err(e) = loaded {
            self.state = SurfaceState::Failed;
            return Err(e);
        }

        let settled =
            bounded(Stage::Settle, self.timeouts.settle(), self.inner.wait_settled()).await;
        if let Err(e) = settled {
            self.state = SurfaceState::Failed;
            return Err(e);
        }

        self.state = SurfaceState::Settled;
        tracing::debug!(surface = self.id, "document settled");
        Ok(())
    }

    /// 取出已稳定的宿主供转换或打印使用
    pub(crate) fn consume(&mut self) -> Result<&mut dyn Surface> {
        if self.state != SurfaceState::Settled {
            return Err(PrintError::Render(format!(
                "surface {} is not ready (state {:?})",
                self.id, self.state
            )));
        }
        self.state = SurfaceState::Consumed;
        Ok(self.inner.as_mut())
    }

    /// 无条件销毁；重复调用或对失败的表面调用都是空操作
    pub fn destroy(&mut self) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        if let Err(e) = self.inner.close() {
            tracing::warn!(surface = self.id, error = %e, "render surface teardown failed");
        }
        self.state = SurfaceState::Destroyed;
        tracing::debug!(surface = self.id, "render surface destroyed");
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        if self.state != SurfaceState::Destroyed {
            tracing::warn!(surface = self.id, state = ?self.state, "render surface dropped without destroy");
            self.destroy();
        }
    }
}
