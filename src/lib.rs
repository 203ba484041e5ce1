//! # SIV Batch Submit
//!
//! 逐条向 SIV 证书查询表单提交登记号，并把每条记录的结果可靠地记下来
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 浏览器能力接口（`BrowserLauncher` / `PageSession`）与 Chromium 实现
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner，在指定 iframe 中执行脚本
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条记录
//! - `SignalProbe` - 成功 / 错误标记探测
//! - `TriggerStrategy` - 提交触发策略
//! - `Classifier` - 原始信号 → 状态
//! - `StateStore` - 状态账本
//! - `ReportWriter` / `Notifier` - 报表与通知
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整提交流程
//! - `AttemptCtx` - 上下文封装（序号 + 登记号）
//! - `FormDriver` - 流程编排（导航 → iframe → 填写 → 提交 → 探测）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_batch` - 顺序批量提交，断点续跑
//! - `orchestrator/batch_processor` - 应用入口，管理资源与收尾
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserLauncher, ChromiumLauncher, FrameRef, NetworkSnapshot, PageSession};
pub use config::Config;
pub use error::{AppError, AppResult, DriverError};
pub use infrastructure::JsExecutor;
pub use models::{RawOutcome, Record, RunState, RunSummary, Status};
pub use orchestrator::{run_batch, App, RunOptions};
pub use services::{Classifier, JsonlStateStore, StateStore};
pub use workflow::{AttemptCtx, FormDriver, Submitter};
