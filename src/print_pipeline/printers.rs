use serde::{Deserialize, Serialize};

use super::render::{bounded, OffscreenSurface, RenderEngine, SurfaceKind};
use crate::config::StageTimeouts;
use crate::error::{PrintError, Result, Stage};

/// 系统打印机信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Printer {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            is_default: false,
        }
    }
}

/// 用一次性表面查询打印机列表。失败时记录日志并返回空列表，从不报错。
pub async fn list(engine: &dyn RenderEngine, timeouts: StageTimeouts) -> Vec<Printer> {
    match enumerate(engine, timeouts).await {
        Ok(printers) => {
            tracing::debug!(count = printers.len(), "printers enumerated");
            printers
        }
        Err(e) => {
            tracing::error!(error = %e, "printer enumeration failed");
            Vec::new()
        }
    }
}

async fn enumerate(engine: &dyn RenderEngine, timeouts: StageTimeouts) -> Result<Vec<Printer>> {
    let mut surface = OffscreenSurface::spawn(engine, SurfaceKind::Offscreen, timeouts).await?;

    let result: Result<Vec<Printer>> = async {
        let blank =
            url::Url::parse("about:blank").map_err(|e| PrintError::Render(e.to_string()))?;
        surface.load(&blank).await?;
        let host = surface.consume()?;
        bounded(Stage::Enumerate, timeouts.enumerate(), host.printers()).await
    }
    .await;

    surface.destroy();
    result
}
