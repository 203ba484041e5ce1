//! 提交上下文
//!
//! 封装"我正在处理第几条记录"这一信息

use crate::models::record::Record;
use std::fmt::Display;

/// 单条记录的处理上下文（只用于日志）
#[derive(Debug, Clone)]
pub struct AttemptCtx {
    /// 在本次批量中的序号（从1开始）
    pub index: usize,

    /// 本次批量的记录总数
    pub total: usize,

    /// 账本键
    pub ledger_key: String,
}

impl AttemptCtx {
    pub fn new(index: usize, total: usize, record: &Record) -> Self {
        Self {
            index,
            total,
            ledger_key: record.ledger_key(),
        }
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[记录 {}/{} {}]", self.index, self.total, self.ledger_key)
    }
}
