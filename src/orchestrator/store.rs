//! 状态持久化
//!
//! 整个 `QueueState` 作为一条记录保存，每次修改后覆盖写入；启动时读取一次。

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;

use crate::error::FileError;
use crate::orchestrator::state::QueueState;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// 读取上次保存的状态，不存在时返回 `None`
    async fn load(&self) -> Result<Option<QueueState>, FileError>;

    /// 覆盖保存当前状态
    async fn save(&self, state: &QueueState) -> Result<(), FileError>;
}

/// JSON 文件存储
///
/// 先写临时文件再重命名，避免中途退出留下半条记录。
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Option<QueueState>, FileError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FileError::read_failed(self.display(), e)),
        };

        let state = serde_json::from_str(&content).map_err(|e| FileError::StateParseFailed {
            path: self.display(),
            source: Box::new(e),
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &QueueState) -> Result<(), FileError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| FileError::write_failed(self.display(), e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| FileError::write_failed(tmp.display().to_string(), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| FileError::write_failed(self.display(), e))?;
        Ok(())
    }
}

/// 内存存储（测试和不需要持久化的场景）
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<QueueState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: QueueState) -> Self {
        Self {
            record: Mutex::new(Some(state)),
        }
    }

    /// 最近一次保存的状态
    pub fn saved(&self) -> Option<QueueState> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<QueueState>, FileError> {
        Ok(self.saved())
    }

    async fn save(&self, state: &QueueState) -> Result<(), FileError> {
        *self
            .record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(state.clone());
        Ok(())
    }
}
