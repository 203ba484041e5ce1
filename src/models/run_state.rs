use crate::models::status::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 账本中单条记录的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub updated_at: String,
}

impl StateEntry {
    pub fn new(status: Status, detail: Option<String>) -> Self {
        Self {
            status,
            detail,
            updated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// 持久化的运行状态：账本键 → 状态
///
/// 断点续跑的唯一依据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub run_timestamp: String,
    pub entries: BTreeMap<String, StateEntry>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_timestamp: chrono::Local::now().to_rfc3339(),
            entries: BTreeMap::new(),
        }
    }

    pub fn status_of(&self, ledger_key: &str) -> Option<Status> {
        self.entries.get(ledger_key).map(|entry| entry.status)
    }

    /// 已有状态且不在重试列表中的记录视为已完成
    pub fn is_resolved(&self, ledger_key: &str, retry: &[Status]) -> bool {
        self.status_of(ledger_key)
            .is_some_and(|status| !retry.contains(&status))
    }

    pub fn insert(&mut self, ledger_key: impl Into<String>, entry: StateEntry) {
        self.entries.insert(ledger_key.into(), entry);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
