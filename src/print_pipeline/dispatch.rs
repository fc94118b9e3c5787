use super::options::PrintSettings;
use super::render::{bounded, OffscreenSurface};
use crate::error::{PrintError, Result, Stage};

/// 把已加载的文档发送到打印机。静默模式必须带打印机名称。
pub async fn print(surface: &mut OffscreenSurface, settings: &PrintSettings) -> Result<()> {
    settings.require_printer()?;

    let after = surface.timeouts().print(settings.silent);
    let id = surface.id();
    let inner = surface.consume()?;

    bounded(Stage::Print, after, inner.print(settings))
        .await
        .map_err(|e| match e {
            PrintError::Render(msg) => PrintError::Print(msg),
            other => other,
        })?;

    tracing::info!(
        surface = id,
        silent = settings.silent,
        printer = settings.device_name.as_deref().unwrap_or("<dialog>"),
        copies = settings.copies,
        "print job dispatched"
    );
    Ok(())
}
