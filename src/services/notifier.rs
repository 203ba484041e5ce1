//! 运行结束通知
//!
//! 通知失败只记录日志，不影响运行结果

use crate::models::summary::RunSummary;
use crate::utils::logging::status_icon;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// `report` 与 `summary_report.json` 内容相同
    async fn notify(&self, summary: &RunSummary, report: &JsonValue) -> Result<()>;
}

/// 只写日志的通知
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &RunSummary, _report: &JsonValue) -> Result<()> {
        let counts: Vec<String> = summary
            .counts()
            .filter(|(_, count)| *count > 0)
            .map(|(status, count)| format!("{} {} {}", status_icon(status), status, count))
            .collect();
        info!(
            "📣 运行 {} 完成: 共 {} 条 | {}",
            summary.run_timestamp(),
            summary.total(),
            counts.join(" | ")
        );
        Ok(())
    }
}

/// 把汇总 POST 到 webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, _summary: &RunSummary, report: &JsonValue) -> Result<()> {
        self.client
            .post(&self.url)
            .json(report)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("发送通知到 {} 失败", self.url))?
            .error_for_status()
            .context("通知接口返回错误状态")?;
        info!("📣 已发送运行通知: {}", self.url);
        Ok(())
    }
}

/// 依次调用所有通知；失败只告警
pub async fn notify_all(notifiers: &[Box<dyn Notifier>], summary: &RunSummary, report: &JsonValue) {
    for notifier in notifiers {
        if let Err(e) = notifier.notify(summary, report).await {
            warn!("⚠️ 通知失败: {:#}", e);
        }
    }
}
