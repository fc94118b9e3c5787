//! 调用方传入的 PDF / 打印选项
//!
//! 前端以任意 JSON 对象传入选项，这里先与默认值浅合并，再解析为强类型结构。
//! 未知字段被忽略，类型错误或越界值在分配任何资源之前报告为 `InvalidOptions`。

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{PrintError, Result};

/// 浅合并：`overrides` 中的键覆盖 `defaults`
pub fn merge(defaults: Value, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// 纸张尺寸：命名尺寸或以英寸表示的自定义尺寸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageSize {
    Named(String),
    Custom { width: f64, height: f64 },
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Named("Letter".to_string())
    }
}

impl PageSize {
    /// (宽, 高)，单位英寸
    pub fn inches(&self) -> Result<(f64, f64)> {
        match self {
            PageSize::Custom { width, height } => {
                if *width <= 0.0 || *height <= 0.0 {
                    return Err(PrintError::InvalidOptions(format!(
                        "pageSize must be positive, got {}x{}",
                        width, height
                    )));
                }
                Ok((*width, *height))
            }
            PageSize::Named(name) => {
                let mm = match name.to_ascii_lowercase().as_str() {
                    "a0" => (841.0, 1189.0),
                    "a1" => (594.0, 841.0),
                    "a2" => (420.0, 594.0),
                    "a3" => (297.0, 420.0),
                    "a4" => (210.0, 297.0),
                    "a5" => (148.0, 210.0),
                    "a6" => (105.0, 148.0),
                    "letter" => return Ok((8.5, 11.0)),
                    "legal" => return Ok((8.5, 14.0)),
                    "tabloid" => return Ok((11.0, 17.0)),
                    "ledger" => return Ok((17.0, 11.0)),
                    _ => {
                        return Err(PrintError::InvalidOptions(format!(
                            "Unknown pageSize: {}",
                            name
                        )))
                    }
                };
                Ok((mm.0 / 25.4, mm.1 / 25.4))
            }
        }
    }
}

/// 页边距，单位英寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// PDF 版式配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    pub landscape: bool,
    pub display_header_footer: bool,
    pub print_background: bool,
    pub scale: f64,
    pub page_size: PageSize,
    pub margins: Option<Margins>,
    pub page_ranges: Option<String>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    #[serde(rename = "preferCSSPageSize")]
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            display_header_footer: false,
            print_background: false,
            scale: 1.0,
            page_size: PageSize::default(),
            margins: None,
            page_ranges: None,
            header_template: None,
            footer_template: None,
            prefer_css_page_size: false,
        }
    }
}

impl PdfOptions {
    /// 将调用方选项合并到 `{ printBackground: true }` 之上
    pub fn from_overrides(overrides: &Map<String, Value>) -> Result<Self> {
        let merged = merge(json!({ "printBackground": true }), overrides);
        let options: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|e| PrintError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.1..=2.0).contains(&self.scale) {
            return Err(PrintError::InvalidOptions(format!(
                "scale must be between 0.1 and 2.0, got {}",
                self.scale
            )));
        }
        self.page_size.inches()?;
        if let Some(margins) = &self.margins {
            let sides = [margins.top, margins.bottom, margins.left, margins.right];
            if sides.iter().flatten().any(|m| *m < 0.0) {
                return Err(PrintError::InvalidOptions(
                    "margins must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplexMode {
    Simplex,
    ShortEdge,
    LongEdge,
}

/// 页码范围，从 0 开始，闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub from: u32,
    pub to: u32,
}

/// 发送到打印机的作业设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintSettings {
    pub silent: bool,
    pub print_background: bool,
    pub device_name: Option<String>,
    pub copies: u32,
    pub landscape: bool,
    pub color: bool,
    pub page_ranges: Vec<PageRange>,
    pub duplex_mode: Option<DuplexMode>,
    pub collate: bool,
    pub page_size: Option<PageSize>,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            silent: false,
            print_background: false,
            device_name: None,
            copies: 1,
            landscape: false,
            color: true,
            page_ranges: Vec::new(),
            duplex_mode: None,
            collate: true,
            page_size: None,
        }
    }
}

impl PrintSettings {
    /// 构造 `{ silent, printBackground: true, deviceName, ...options }`
    pub fn from_overrides(
        silent: bool,
        device_name: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Self> {
        let defaults = json!({
            "silent": silent,
            "printBackground": true,
            "deviceName": device_name,
        });
        let merged = merge(defaults, overrides);
        let settings: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|e| PrintError::InvalidOptions(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.copies == 0 {
            return Err(PrintError::InvalidOptions(
                "copies must be at least 1".to_string(),
            ));
        }
        if let Some(range) = self.page_ranges.iter().find(|r| r.from > r.to) {
            return Err(PrintError::InvalidOptions(format!(
                "page range {}-{} is reversed",
                range.from, range.to
            )));
        }
        if let Some(size) = &self.page_size {
            size.inches()?;
        }
        Ok(())
    }

    /// 静默作业必须指明打印机；空白名称视同未指定
    pub fn require_printer(&self) -> Result<()> {
        let named = self
            .device_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if self.silent && !named {
            return Err(PrintError::MissingInput("printer"));
        }
        Ok(())
    }

    /// 假脱机打印前渲染 PDF 时使用的版式
    pub fn pdf_options(&self) -> PdfOptions {
        let page_ranges = if self.page_ranges.is_empty() {
            None
        } else {
            let ranges: Vec<String> = self
                .page_ranges
                .iter()
                .map(|r| {
                    if r.from == r.to {
                        format!("{}", r.from + 1)
                    } else {
                        format!("{}-{}", r.from + 1, r.to + 1)
                    }
                })
                .collect();
            Some(ranges.join(","))
        };

        PdfOptions {
            landscape: self.landscape,
            print_background: self.print_background,
            page_size: self.page_size.clone().unwrap_or_default(),
            page_ranges,
            ..PdfOptions::default()
        }
    }
}
