//! 运行汇总
//!
//! `SummaryBuilder` 在运行过程中按状态分桶累积，
//! `RunSummary` 在运行结束时生成一次，之后只读

use crate::models::record::Record;
use crate::models::run_state::RunState;
use crate::models::status::Status;
use std::collections::BTreeMap;

/// 运行结束后的只读汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    run_timestamp: String,
    buckets: BTreeMap<Status, Vec<String>>,
    resumed: usize,
}

impl RunSummary {
    /// 从持久化状态重建汇总（任意时刻都可以调用）
    ///
    /// 尚未出现在账本中的记录不计入
    pub fn from_state(records: &[Record], state: &RunState) -> Self {
        let mut builder = SummaryBuilder::new(state.run_timestamp.clone());
        for record in records {
            if let Some(status) = state.status_of(&record.ledger_key()) {
                builder.add(record, status);
            }
        }
        builder.finish()
    }

    pub fn run_timestamp(&self) -> &str {
        &self.run_timestamp
    }

    /// 已得到状态的记录总数（包括跳过的）
    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn count(&self, status: Status) -> usize {
        self.buckets.get(&status).map_or(0, Vec::len)
    }

    /// 某个状态下的登记号列表（按输入顺序）
    pub fn keys(&self, status: Status) -> &[String] {
        self.buckets.get(&status).map_or(&[], Vec::as_slice)
    }

    /// 直接沿用账本中已有状态、没有重新提交的记录数
    pub fn resumed(&self) -> usize {
        self.resumed
    }

    /// 按报表顺序返回 (状态, 数量)
    pub fn counts(&self) -> impl Iterator<Item = (Status, usize)> + '_ {
        Status::ALL.into_iter().map(|status| (status, self.count(status)))
    }
}

/// 运行中的汇总累积器
#[derive(Debug)]
pub struct SummaryBuilder {
    run_timestamp: String,
    buckets: BTreeMap<Status, Vec<String>>,
    resumed: usize,
}

impl SummaryBuilder {
    pub fn new(run_timestamp: impl Into<String>) -> Self {
        let buckets = Status::ALL
            .into_iter()
            .map(|status| (status, Vec::new()))
            .collect();
        Self {
            run_timestamp: run_timestamp.into(),
            buckets,
            resumed: 0,
        }
    }

    pub fn add(&mut self, record: &Record, status: Status) {
        self.buckets
            .entry(status)
            .or_default()
            .push(record.ledger_key());
    }

    pub fn add_resumed(&mut self, record: &Record, status: Status) {
        self.add(record, status);
        self.resumed += 1;
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            run_timestamp: self.run_timestamp,
            buckets: self.buckets,
            resumed: self.resumed,
        }
    }
}
