use super::options::PdfOptions;
use super::render::{bounded, OffscreenSurface};
use crate::error::{PrintError, Result, Stage};

/// 把已稳定的表面分页输出为 PDF 字节流。不重试，失败直接返回给调用方。
pub async fn to_pdf(surface: &mut OffscreenSurface, options: &PdfOptions) -> Result<Vec<u8>> {
    let after = surface.timeouts().convert();
    let id = surface.id();
    let inner = surface.consume()?;

    let bytes = bounded(Stage::Convert, after, inner.print_to_pdf(options))
        .await
        .map_err(|e| match e {
            PrintError::Render(msg) => PrintError::Conversion(msg),
            other => other,
        })?;

    if bytes.is_empty() {
        return Err(PrintError::Conversion("render host produced an empty PDF".to_string()));
    }

    tracing::debug!(surface = id, size = bytes.len(), "PDF generated");
    Ok(bytes)
}
