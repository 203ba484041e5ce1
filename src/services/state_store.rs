//! 运行状态账本 - 业务能力层
//!
//! 只负责“把一条记录的状态可靠地写下来”，不关心流程。
//! 每次写入都在返回前落盘，进程随时被杀也只会丢失正在处理的那一条

use crate::error::{AppError, AppResult, FileError};
use crate::models::run_state::{RunState, StateEntry};
use crate::models::status::Status;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// 账本存储
///
/// 唯一的写入者是编排层
#[async_trait]
pub trait StateStore: Send {
    fn state(&self) -> &RunState;

    /// 持久化一条状态；返回 `Ok` 时写入已经落盘
    async fn persist(&mut self, ledger_key: &str, entry: StateEntry) -> AppResult<()>;
}

/// 账本中的一行
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum LedgerLine {
    Entry {
        key: String,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        updated_at: String,
    },
    Header {
        run_timestamp: String,
    },
}

/// 追加写的 JSON Lines 账本
///
/// 第一行是运行头 `{"run_timestamp": ...}`，之后每行一条状态，后写的覆盖先写的
pub struct JsonlStateStore {
    path: PathBuf,
    state: RunState,
}

impl JsonlStateStore {
    /// 打开账本；`fresh` 为真或文件不存在时新建
    pub async fn open(path: impl AsRef<Path>, fresh: bool) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        if fresh || !path.exists() {
            let store = Self {
                path,
                state: RunState::new(),
            };
            store.write_header().await?;
            info!("📒 新建状态账本: {}", store.path.display());
            return Ok(store);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let state = replay(&content, &path);

        // 上次写到一半被中断时，先补上换行，避免新行接在残行后面
        if !content.is_empty() && !content.ends_with('\n') {
            append(&path, "\n").await?;
        }

        info!(
            "📒 载入状态账本: {} ({} 条记录)",
            path.display(),
            state.entries.len()
        );
        Ok(Self { path, state })
    }

    async fn write_header(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
            }
        }
        let header = LedgerLine::Header {
            run_timestamp: self.state.run_timestamp.clone(),
        };
        let line = to_line(&header, &self.path)?;
        let mut file = fs::File::create(&self.path)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        write_synced(&mut file, &line, &self.path).await
    }
}

#[async_trait]
impl StateStore for JsonlStateStore {
    fn state(&self) -> &RunState {
        &self.state
    }

    async fn persist(&mut self, ledger_key: &str, entry: StateEntry) -> AppResult<()> {
        let line = to_line(
            &LedgerLine::Entry {
                key: ledger_key.to_string(),
                status: entry.status,
                detail: entry.detail.clone(),
                updated_at: entry.updated_at.clone(),
            },
            &self.path,
        )?;
        append(&self.path, &line).await?;
        debug!("账本写入: {} → {}", ledger_key, entry.status);

        self.state.insert(ledger_key, entry);
        Ok(())
    }
}

/// 重放账本内容，无法解析的行（通常是被中断的最后一行）被忽略
fn replay(content: &str, path: &Path) -> RunState {
    let mut state = RunState::new();
    let lines: Vec<&str> = content.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LedgerLine>(line) {
            Ok(LedgerLine::Header { run_timestamp }) => state.run_timestamp = run_timestamp,
            Ok(LedgerLine::Entry {
                key,
                status,
                detail,
                updated_at,
            }) => state.insert(
                key,
                StateEntry {
                    status,
                    detail,
                    updated_at,
                },
            ),
            Err(e) if index + 1 == lines.len() => {
                warn!("⚠️ 账本最后一行不完整，已忽略 ({}): {}", path.display(), e);
            }
            Err(e) => {
                warn!(
                    "⚠️ 账本第 {} 行无法解析，已忽略 ({}): {}",
                    index + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    state
}

fn to_line(line: &LedgerLine, path: &Path) -> AppResult<String> {
    let mut text = serde_json::to_string(line).map_err(|source| FileError::SerializeFailed {
        path: path.display().to_string(),
        source,
    })?;
    text.push('\n');
    Ok(text)
}

async fn append(path: &Path, line: &str) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    write_synced(&mut file, line, path).await
}

async fn write_synced(file: &mut fs::File, line: &str, path: &Path) -> AppResult<()> {
    let write = async {
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await
    };
    write
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}
