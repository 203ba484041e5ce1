//! 顺序批量提交 - 编排层
//!
//! ## 职责
//!
//! - 严格按输入顺序逐条处理，同一时间只有一次提交
//! - 续跑：账本中已有状态的记录直接沿用
//! - 每条记录的状态在处理下一条之前落盘
//! - 单条记录的任何失败都不会中断批量；只有账本写入失败才会

use anyhow::{Context, Result};
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::models::record::Record;
use crate::models::run_state::StateEntry;
use crate::models::status::Status;
use crate::models::summary::{RunSummary, SummaryBuilder};
use crate::services::classifier::{Classification, Classifier};
use crate::services::state_store::StateStore;
use crate::utils::logging::{status_icon, truncate_text};
use crate::utils::panic::panic_message;
use crate::workflow::{AttemptCtx, Submitter};

/// 批量运行参数
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// 账本中处于这些状态的记录会被重新提交
    pub retry_statuses: Vec<Status>,
    /// 单条记录（含浏览器启动与释放）的总时限
    pub record_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            retry_statuses: Vec::new(),
            record_timeout: Duration::from_secs(300),
        }
    }
}

/// 逐条提交所有记录，返回本次运行的汇总
///
/// 返回 `Err` 只意味着账本无法写入
pub async fn run_batch(
    submitter: &dyn Submitter,
    store: &mut dyn StateStore,
    classifier: &Classifier,
    records: &[Record],
    options: &RunOptions,
) -> Result<RunSummary> {
    let total = records.len();
    let mut summary = SummaryBuilder::new(store.state().run_timestamp.clone());
    let mut seen: HashSet<String> = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let ctx = AttemptCtx::new(index + 1, total, record);
        let ledger_key = record.ledger_key();

        // ========== 同一输入中的重复登记号：沿用第一次的结果 ==========
        if !seen.insert(ledger_key.clone()) {
            if let Some(status) = store.state().status_of(&ledger_key) {
                info!("{} 🔁 重复的登记号，沿用第一次的结果: {}", ctx, status);
                summary.add(record, status);
                continue;
            }
        }

        // ========== 续跑：已有状态 ==========
        if store.state().is_resolved(&ledger_key, &options.retry_statuses) {
            if let Some(status) = store.state().status_of(&ledger_key) {
                info!("{} ♻️ 账本中已有状态: {}", ctx, status);
                summary.add_resumed(record, status);
                continue;
            }
        }

        // ========== 登记号为空：跳过 ==========
        let classification = if !record.is_submittable() {
            info!("{} ⏭️ 登记号为空，跳过", ctx);
            Classification::new(Status::Skipped, Some("登记号为空".to_string()))
        } else {
            submit_one(submitter, classifier, record, &ctx, options.record_timeout).await
        };

        let entry = StateEntry::new(classification.status, classification.detail.clone());
        store
            .persist(&ledger_key, entry)
            .await
            .with_context(|| format!("{} 无法写入状态账本，终止运行", ctx))?;

        info!(
            "{} {} {}{}",
            ctx,
            status_icon(classification.status),
            classification.status,
            classification
                .detail
                .as_deref()
                .map(|d| format!(" ({})", truncate_text(d, 120)))
                .unwrap_or_default()
        );
        summary.add(record, classification.status);
    }

    Ok(summary.finish())
}

/// 提交并分类一条记录；任何异常都落到 technical_error
async fn submit_one(
    submitter: &dyn Submitter,
    classifier: &Classifier,
    record: &Record,
    ctx: &AttemptCtx,
    record_timeout: Duration,
) -> Classification {
    info!("{} 🚀 开始提交", ctx);
    let guarded = AssertUnwindSafe(submitter.submit(record, ctx)).catch_unwind();

    match timeout(record_timeout, guarded).await {
        Ok(Ok(Ok(attempt))) => {
            info!(
                "{} ⏱️ 耗时 {:.1}s，填写字段: {}",
                ctx,
                attempt.elapsed().as_secs_f64(),
                attempt
                    .sent_fields
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            classifier.classify(&attempt.outcome)
        }
        Ok(Ok(Err(e))) => {
            warn!("{} ❌ 提交失败: {:#}", ctx, e);
            Classification::new(Status::TechnicalError, Some(format!("{:#}", e)))
        }
        Ok(Err(panic)) => {
            let message = panic_message(&*panic);
            warn!("{} ❌ 提交过程 panic: {}", ctx, message);
            Classification::new(Status::TechnicalError, Some(format!("panic: {}", message)))
        }
        Err(_) => {
            warn!("{} ⏰ 超过单条记录时限", ctx);
            Classification::new(
                Status::TechnicalError,
                Some(format!("单条记录超时 ({}ms)", record_timeout.as_millis())),
            )
        }
    }
}
