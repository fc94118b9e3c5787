use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{PrintError, Result};

/// 上次成功保存 PDF 的目录
pub const LAST_SAVE_PATH_KEY: &str = "lastSavePath";

/// 小型持久化键值存储。并发写入不加锁协调，后写者覆盖先写者。
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// 以扁平 JSON 对象保存在磁盘上的存储
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// 打开（或新建）存储文件；内容在打开时一次性读入
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| {
                PrintError::filesystem(format!("Failed to read {}", path.display()), e)
            })?;
            match serde_json::from_str::<Value>(&json)? {
                Value::Object(map) => map,
                _ => {
                    return Err(PrintError::Config(format!(
                        "{} is not a JSON object",
                        path.display()
                    )))
                }
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PrintError::filesystem(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        let json = serde_json::to_string_pretty(values)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|e| {
            PrintError::filesystem(format!("Failed to write {}", staging.display()), e)
        })?;
        fs::rename(&staging, &self.path).map_err(|e| {
            PrintError::filesystem(format!("Failed to replace {}", self.path.display()), e)
        })
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&values)
    }
}

/// 内存存储，用于测试和无磁盘场景
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
