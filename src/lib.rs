//! Patient Care 桌面端的文档导出与打印后端
//!
//! 管线本身不依赖桌面运行时：渲染引擎、保存对话框和配置存储都在 trait
//! 之后，桌面外壳（`desktop` feature）负责把它们接到真实实现上。

pub mod chrome;
pub mod config;
pub mod error;
pub mod logging;
pub mod print_pipeline;
pub mod store;

#[cfg(feature = "desktop")]
pub mod commands;
#[cfg(feature = "desktop")]
pub mod dialog;

pub use config::PrintConfig;
pub use error::{PrintError, Result};
pub use print_pipeline::{ExportRequest, PrintOutcome, PrintRequest, PrintService, SaveResult};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
