use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::default_documents_dir;
use crate::error::Result;
use crate::store::{ConfigStore, LAST_SAVE_PATH_KEY};

/// 保存对话框的初始状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogRequest {
    pub directory: PathBuf,
    pub file_name: String,
    /// 仅允许的扩展名（不含点）
    pub extension: &'static str,
    pub can_create_directories: bool,
}

impl SaveDialogRequest {
    pub fn default_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// 平台保存对话框；返回 `None` 表示用户取消
#[async_trait]
pub trait SaveDialog: Send + Sync {
    async fn pick(&self, request: SaveDialogRequest) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveDestination {
    Canceled,
    Chosen(PathBuf),
}

/// 把用户的选择（或取消）转换为具体的输出路径
pub struct SaveDestinationResolver {
    store: Arc<dyn ConfigStore>,
    dialog: Arc<dyn SaveDialog>,
}

impl SaveDestinationResolver {
    pub fn new(store: Arc<dyn ConfigStore>, dialog: Arc<dyn SaveDialog>) -> Self {
        Self { store, dialog }
    }

    /// 对话框起始目录：上次保存的目录，否则为系统文档目录
    pub fn default_dir(&self) -> PathBuf {
        self.store
            .get(LAST_SAVE_PATH_KEY)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_documents_dir)
    }

    pub async fn resolve(
        &self,
        default_dir: Option<&Path>,
        suggested_name: &str,
    ) -> Result<SaveDestination> {
        let directory = default_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_dir());

        let request = SaveDialogRequest {
            directory,
            file_name: suggested_name.to_string(),
            extension: "pdf",
            can_create_directories: true,
        };
        tracing::debug!(default_path = %request.default_path().display(), "opening save dialog");

        match self.dialog.pick(request).await? {
            None => Ok(SaveDestination::Canceled),
            Some(path) if path.as_os_str().is_empty() => Ok(SaveDestination::Canceled),
            Some(path) => Ok(SaveDestination::Chosen(path)),
        }
    }

    /// 成功保存后记录所在目录，供下次对话框使用
    /// 没有目录部分的路径（如 `out.pdf`）不覆盖已记录的目录
    pub fn remember(&self, saved: &Path) -> Result<()> {
        match saved.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => self.store.set(LAST_SAVE_PATH_KEY, &dir.to_string_lossy()),
            None => {
                tracing::debug!(path = %saved.display(), "saved path has no directory, keeping last save path");
                Ok(())
            }
        }
    }
}
