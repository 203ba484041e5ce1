//! 表单提交流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整提交流程
//!
//! 流程顺序：
//! 1. 打开全新的浏览上下文 → 导航到入口页
//! 2. 定位承载表单的 iframe → 等待登记号字段出现
//! 3. 填写字段 → 按策略顺序触发提交
//! 4. 等待网络空闲 → 并发探测成功 / 错误标记
//! 5. 无论成败都释放浏览上下文
//!
//! 协议中的任何问题都变成 `RawOutcome::Failure`，不会向上抛错

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::browser::{BrowserLauncher, FrameRef, NetworkSnapshot, PageSession};
use crate::config::Config;
use crate::error::DriverError;
use crate::models::outcome::{DriverFailure, RawOutcome, Signals, Step, SubmissionAttempt};
use crate::models::record::Record;
use crate::services::signal_probe::{first_hit, probes_from_config, SignalProbe};
use crate::services::trigger::TriggerStrategy;
use crate::utils::panic::panic_message;
use crate::utils::wait::poll_until;
use crate::workflow::attempt_ctx::AttemptCtx;

/// 提交能力：编排层与驱动之间的接缝
#[async_trait]
pub trait Submitter: Send + Sync {
    /// 提交一条记录并返回原始结果
    ///
    /// 只有在无法产生任何结果时才返回 `Err`
    async fn submit(&self, record: &Record, ctx: &AttemptCtx) -> Result<SubmissionAttempt>;
}

/// 表单驱动
///
/// - 每条记录使用一个全新的浏览上下文
/// - 不持有跨记录的页面状态
/// - 只报告观察到的信号，不决定最终状态
pub struct FormDriver<L> {
    launcher: L,
    config: Config,
    success_probes: Vec<Box<dyn SignalProbe>>,
    error_probes: Vec<Box<dyn SignalProbe>>,
}

impl<L: BrowserLauncher> FormDriver<L> {
    pub fn new(launcher: L, config: &Config) -> Self {
        let (success_probes, error_probes) = probes_from_config(config);
        Self {
            launcher,
            config: config.clone(),
            success_probes,
            error_probes,
        }
    }

    /// 使用自定义探针
    pub fn with_probes(
        mut self,
        success_probes: Vec<Box<dyn SignalProbe>>,
        error_probes: Vec<Box<dyn SignalProbe>>,
    ) -> Self {
        self.success_probes = success_probes;
        self.error_probes = error_probes;
        self
    }

    async fn run_protocol(
        &self,
        session: &dyn PageSession,
        record: &Record,
        ctx: &AttemptCtx,
        sent_fields: &mut Vec<(String, String)>,
    ) -> std::result::Result<Signals, DriverFailure> {
        let cfg = &self.config;

        // ========== 1. 导航 ==========
        info!("{} 🌐 打开入口页...", ctx);
        bounded(Step::Navigation, cfg.navigation_timeout, session.navigate(&cfg.target_url)).await?;

        // ========== 2. 定位 iframe ==========
        let fragment = cfg.frame_url_fragment.as_str();
        let frame = poll_until(cfg.frame_timeout, cfg.poll_interval, move || async move {
            session.find_frame(fragment).await
        })
        .await
        .map_err(|_| {
            DriverError::FormContextNotFound {
                fragment: fragment.to_string(),
            }
            .into_failure(Step::FormContext)
        })?;
        debug!("{} 表单 iframe: {}", ctx, frame.url);

        // ========== 3. 等待登记号字段 ==========
        let primary = cfg.primary_selector().ok_or_else(|| {
            DriverFailure::new(Step::FieldReady, format!("字段 {} 没有配置选择器", cfg.key_field))
        })?;
        self.wait_for_selector(session, &frame, primary).await?;

        // ========== 4. 填写 ==========
        for (name, selector) in &cfg.field_selectors {
            let Some(selector) = selector.as_deref() else {
                continue;
            };
            let value = if *name == cfg.key_field {
                Some(record.key.as_str()).filter(|key| !key.is_empty())
            } else {
                record.field(name)
            };
            let Some(value) = value else {
                continue;
            };

            let filled = session
                .fill(&frame, selector, value)
                .await
                .map_err(|e| e.into_failure(Step::Fill))?;
            if !filled {
                return Err(DriverError::FieldNotFound {
                    field: name.clone(),
                    selector: selector.to_string(),
                }
                .into_failure(Step::Fill));
            }
            sent_fields.push((name.clone(), value.to_string()));
        }
        info!("{} ✍️ 已填写 {} 个字段", ctx, sent_fields.len());
        sleep(cfg.settle_delay).await;

        // ========== 5. 提交 ==========
        let strategy = self.trigger_submit(session, &frame, ctx).await?;
        info!("{} 📤 已提交 ({})", ctx, strategy);

        // ========== 6. 等待网络空闲 ==========
        self.wait_for_network_quiet(session, &frame)
            .await
            .map_err(|e| e.into_failure(Step::NetworkIdle))?;

        // ========== 7. 探测结果标记 ==========
        let (success, error) = tokio::join!(
            first_hit(
                &self.success_probes,
                session,
                &frame,
                cfg.probe_timeout,
                cfg.poll_interval
            ),
            first_hit(
                &self.error_probes,
                session,
                &frame,
                cfg.probe_timeout,
                cfg.poll_interval
            ),
        );

        let page_text = match &error {
            Some(_) => match session.body_text(&frame).await {
                Ok(text) => Some(text),
                Err(e) => {
                    debug!("{} 无法读取 iframe 正文: {}", ctx, e);
                    None
                }
            },
            None => None,
        };

        Ok(Signals {
            success,
            error,
            page_text,
        })
    }

    async fn wait_for_selector(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
        selector: &str,
    ) -> std::result::Result<(), DriverFailure> {
        let limit = self.config.selector_timeout;
        poll_until(limit, self.config.poll_interval, move || async move {
            Ok(session.selector_present(frame, selector).await?.then_some(()))
        })
        .await
        .map_err(|timeout| {
            DriverError::timeout_after_error(Step::FieldReady, limit, timeout.last_error)
                .into_failure(Step::FieldReady)
        })
    }

    /// 按顺序尝试提交策略，返回成功的那一个
    async fn trigger_submit(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
        ctx: &AttemptCtx,
    ) -> std::result::Result<TriggerStrategy, DriverFailure> {
        let limit = self.config.submit_timeout;
        let mut causes = Vec::new();

        for &strategy in &self.config.trigger_strategies {
            let fired = timeout(
                limit,
                strategy.fire(session, frame, &self.config.submit_selector),
            )
            .await;
            match fired {
                Ok(Ok(())) => return Ok(strategy),
                Ok(Err(e)) => {
                    warn!("{} ⚠️ 提交策略 {} 失败: {}", ctx, strategy, e);
                    causes.push(format!("{}: {}", strategy, e));
                }
                Err(_) => {
                    warn!("{} ⚠️ 提交策略 {} 超时", ctx, strategy);
                    causes.push(format!("{}: 超时 ({}ms)", strategy, limit.as_millis()));
                }
            }
        }

        Err(DriverError::SubmitFailed(causes.join("; ")).into_failure(Step::Submit))
    }

    /// iframe 文档加载完成、没有进行中的请求，且网络活动在静默窗口内保持不变
    async fn wait_for_network_quiet(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
    ) -> std::result::Result<(), DriverError> {
        let limit = self.config.network_idle_timeout;
        let quiet = self.config.network_quiet_window;
        let interval = self.config.poll_interval;
        let mut last_error = None;

        let waited = timeout(limit, async {
            // 请求全部结束后，网络活动需保持 `quiet` 不变
            let mut stable_since: Option<(NetworkSnapshot, Instant)> = None;
            loop {
                match session.network_snapshot(frame).await {
                    Ok(snapshot) if snapshot.is_settled() => match &stable_since {
                        Some((previous, since)) if previous.same_activity(&snapshot) => {
                            if since.elapsed() >= quiet {
                                return;
                            }
                        }
                        _ => stable_since = Some((snapshot, Instant::now())),
                    },
                    Ok(_) => stable_since = None,
                    Err(e) => {
                        stable_since = None;
                        last_error = Some(e.to_string());
                    }
                }
                sleep(interval).await;
            }
        })
        .await;

        waited.map_err(|_| DriverError::timeout_after_error(Step::NetworkIdle, limit, last_error))
    }
}

#[async_trait]
impl<L: BrowserLauncher> Submitter for FormDriver<L> {
    async fn submit(&self, record: &Record, ctx: &AttemptCtx) -> Result<SubmissionAttempt> {
        let started_at = Instant::now();
        let attempt = |sent_fields: Vec<(String, String)>, outcome: RawOutcome| SubmissionAttempt {
            key: record.key.clone(),
            sent_fields,
            started_at,
            outcome,
        };

        let session = match self.launcher.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!("{} ❌ 无法打开浏览器: {}", ctx, e);
                let failure = e.into_failure(Step::Launch);
                return Ok(attempt(Vec::new(), RawOutcome::Failure(failure)));
            }
        };

        let mut sent_fields = Vec::new();
        let result = AssertUnwindSafe(self.run_protocol(
            session.as_ref(),
            record,
            ctx,
            &mut sent_fields,
        ))
        .catch_unwind()
        .await;

        // 每条路径都要释放浏览上下文
        session.close().await;

        let outcome = match result {
            Ok(Ok(signals)) => RawOutcome::Signals(signals),
            Ok(Err(failure)) => {
                warn!("{} ❌ {}", ctx, failure);
                RawOutcome::Failure(failure)
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                warn!("{} ❌ 表单流程 panic: {}", ctx, message);
                RawOutcome::Failure(DriverFailure::new(Step::Unexpected, message))
            }
        };

        Ok(attempt(sent_fields, outcome))
    }
}

/// 给单次操作加上时限
async fn bounded<T, F>(step: Step, limit: Duration, fut: F) -> std::result::Result<T, DriverFailure>
where
    F: Future<Output = std::result::Result<T, DriverError>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| e.into_failure(step)),
        Err(_) => Err(DriverError::timeout(step, limit).into_failure(step)),
    }
}
