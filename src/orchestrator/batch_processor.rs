//! 批量处理入口 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源的创建和运行结束后的收尾。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、写日志文件头、编译“无匹配”文案
//! 2. **加载记录**：从输入文件读取 `Vec<Record>`
//! 3. **打开账本**：默认续跑，`FRESH=true` 时从头开始
//! 4. **顺序提交**：委托 `run_batch` 逐条处理
//! 5. **收尾**：写报表、发送通知、输出最终统计

use crate::browser::ChromiumLauncher;
use crate::config::Config;
use crate::models::summary::RunSummary;
use crate::models::{load_records, Record};
use crate::orchestrator::run_batch::{run_batch, RunOptions};
use crate::services::notifier::{notify_all, LogNotifier, Notifier, WebhookNotifier};
use crate::services::report_writer::{summary_json, ReportWriter};
use crate::services::{Classifier, JsonlStateStore, StateStore};
use crate::utils::logging::{init_log_file, log_records_loaded, log_startup, print_final_stats};
use crate::workflow::FormDriver;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    classifier: Classifier,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置不完整")?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法初始化日志文件: {}", config.output_log_file))?;

        log_startup(&config.target_url, config.headless);

        let classifier =
            Classifier::new(&config.no_match_phrases).context("无法编译 NO_MATCH_PHRASES")?;

        let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
        if let Some(url) = &config.notify_webhook_url {
            info!("📣 运行结束后将通知: {}", url);
            notifiers.push(Box::new(WebhookNotifier::new(url.clone())));
        }

        Ok(Self {
            config,
            classifier,
            notifiers,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 输入为空时同样写出（全零的）报表并发送通知
    pub async fn run(&self) -> Result<RunSummary> {
        let records = self.load_records().await?;

        if records.is_empty() {
            warn!("⚠️ 输入文件中没有记录");
        }

        let mut store = JsonlStateStore::open(&self.config.state_file, self.config.fresh)
            .await
            .context("无法打开状态账本")?;

        let options = RunOptions {
            retry_statuses: self.config.retry_statuses.clone(),
            record_timeout: self.config.record_timeout,
        };
        let already_resolved = records
            .iter()
            .filter(|r| {
                store
                    .state()
                    .is_resolved(&r.ledger_key(), &options.retry_statuses)
            })
            .count();
        log_records_loaded(records.len(), already_resolved);

        let driver = FormDriver::new(ChromiumLauncher::new(&self.config), &self.config);
        let summary = run_batch(&driver, &mut store, &self.classifier, &records, &options).await?;

        let paths = ReportWriter::new(&self.config.output_dir)
            .write(&summary, store.state(), &records)
            .await
            .context("无法写入报表")?;
        let report = summary_json(&summary, &paths);
        notify_all(&self.notifiers, &summary, &report).await;

        print_final_stats(&summary, &self.config.output_log_file);

        Ok(summary)
    }

    /// 加载记录
    async fn load_records(&self) -> Result<Vec<Record>> {
        info!("\n📁 正在读取输入文件...");
        load_records(Path::new(&self.config.input_file), &self.config.key_field).await
    }
}
