use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PrintError, Result};
use crate::logging::LoggingSettings;

pub const PRINT_CONFIG_FILE: &str = "print-config.json";
pub const DEFAULT_FILE_NAME: &str = "Prescription - Patient Care.pdf";

/// 导出/打印管线配置，所有字段都有默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintConfig {
    pub export_temp_dir: PathBuf,
    pub print_temp_dir: PathBuf,
    pub default_file_name: String,
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub timeouts: StageTimeouts,
    pub logging: LoggingSettings,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            export_temp_dir: std::env::temp_dir(),
            print_temp_dir: default_resource_root().join("temp"),
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            chrome_path: None,
            window_width: 800,
            window_height: 1100,
            timeouts: StageTimeouts::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PrintConfig {
    /// 从配置目录读取；文件不存在时使用默认值
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(PRINT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| PrintError::filesystem(format!("Failed to read {}", path.display()), e))?;
        serde_json::from_str(&json)
            .map_err(|e| PrintError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// 各挂起点的超时（毫秒）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageTimeouts {
    pub spawn_ms: u64,
    pub load_ms: u64,
    pub settle_ms: u64,
    pub convert_ms: u64,
    pub print_ms: u64,
    pub dialog_print_ms: u64,
    pub enumerate_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            spawn_ms: 20_000,
            load_ms: 30_000,
            settle_ms: 5_000,
            convert_ms: 60_000,
            print_ms: 120_000,
            dialog_print_ms: 600_000,
            enumerate_ms: 15_000,
        }
    }
}

impl StageTimeouts {
    pub fn spawn(&self) -> Duration {
        Duration::from_millis(self.spawn_ms)
    }

    pub fn load(&self) -> Duration {
        Duration::from_millis(self.load_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn convert(&self) -> Duration {
        Duration::from_millis(self.convert_ms)
    }

    pub fn print(&self, silent: bool) -> Duration {
        if silent {
            Duration::from_millis(self.print_ms)
        } else {
            Duration::from_millis(self.dialog_print_ms)
        }
    }

    pub fn enumerate(&self) -> Duration {
        Duration::from_millis(self.enumerate_ms)
    }
}

/// 应用资源根目录（可执行文件所在目录，取不到时退回当前目录）
pub fn default_resource_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 保存对话框的兜底目录：系统文档目录
pub fn default_documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
