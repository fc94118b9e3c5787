use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{PrintError, Result};

/// 在固定工作目录中创建唯一命名的 HTML 临时文件
#[derive(Debug, Clone)]
pub struct TempArtifactManager {
    dir: PathBuf,
    naming: Naming,
}

#[derive(Debug, Clone, Copy)]
enum Naming {
    Timestamped,
    Template,
}

impl TempArtifactManager {
    /// 导出 PDF 使用的临时文件：`temp-<毫秒时间戳>-<id>.html`
    pub fn for_export(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            naming: Naming::Timestamped,
        }
    }

    /// 打印使用的临时文件：`temporal-template-<id>.html`
    pub fn for_print(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            naming: Naming::Template,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(&self, created_at: DateTime<Utc>) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let short = &id[..8];
        match self.naming {
            Naming::Timestamped => format!("temp-{}-{}.html", created_at.timestamp_millis(), short),
            Naming::Template => format!("temporal-template-{}.html", short),
        }
    }

    /// 写入内容并返回句柄。目录创建或写入失败都会中止请求。
    pub async fn create(&self, content: &str) -> Result<TempArtifact> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            PrintError::filesystem(format!("Failed to create {}", self.dir.display()), e)
        })?;

        let created_at = Utc::now();
        let path = self.dir.join(self.file_name(created_at));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| PrintError::filesystem(format!("Failed to create {}", path.display()), e))?;

        // 文件已存在：即使写入失败也要交给句柄负责删除
        let artifact = TempArtifact {
            path,
            created_at,
            deleted: false,
        };

        let written = async {
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;
        drop(file);

        match written {
            Ok(()) => {
                tracing::debug!(path = %artifact.path.display(), "temp artifact created");
                Ok(artifact)
            }
            Err(e) => {
                let context = format!("Failed to write {}", artifact.path.display());
                artifact.destroy().await;
                Err(PrintError::filesystem(context, e))
            }
        }
    }
}

/// 由创建它的请求独占的临时文件，恰好删除一次
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    created_at: DateTime<Utc>,
    deleted: bool,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn file_url(&self) -> Result<Url> {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| PrintError::filesystem("Failed to resolve current dir", e))?
                .join(&self.path)
        };
        Url::from_file_path(&absolute)
            .map_err(|_| PrintError::Render(format!("Not a file path: {}", absolute.display())))
    }

    /// 删除文件；失败只记录警告，从不向调用方传播
    pub async fn destroy(mut self) {
        self.deleted = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "temp artifact deleted"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to delete temp artifact")
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.deleted {
            return;
        }
        // 持有者未调用 destroy（例如任务被取消），同步补删
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to delete temp artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::for_export(dir.path().join("work"));

        let artifact = manager.create("<p>hi</p>").await.unwrap();
        let name = artifact.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("temp-") && name.ends_with(".html"), "{name}");
        assert_eq!(std::fs::read_to_string(artifact.path()).unwrap(), "<p>hi</p>");
        assert_eq!(artifact.file_url().unwrap().scheme(), "file");

        let path = artifact.path().to_path_buf();
        artifact.destroy().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn names_are_unique_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::for_print(dir.path());

        let a = manager.create("a").await.unwrap();
        let b = manager.create("b").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("temporal-template-"));

        a.destroy().await;
        b.destroy().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dropped_artifact_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::for_export(dir.path());

        let artifact = manager.create("x").await.unwrap();
        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn destroy_of_missing_file_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::for_export(dir.path());

        let artifact = manager.create("x").await.unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        artifact.destroy().await;
    }

    #[tokio::test]
    async fn unusable_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a dir").unwrap();

        let manager = TempArtifactManager::for_export(blocker.join("work"));
        let err = manager.create("x").await.unwrap_err();
        assert!(matches!(err, PrintError::Filesystem { .. }));
    }
}
