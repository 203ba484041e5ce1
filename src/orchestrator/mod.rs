//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和运行收尾，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 加载记录（Vec<Record>），打开状态账本
//! - 写报表、发送通知、输出全局统计
//!
//! ### `run_batch` - 顺序批量提交
//! - 按输入顺序逐条提交（同一时间只有一次提交）
//! - 续跑判断、空登记号跳过、重复登记号沿用
//! - 每条记录分类后立即落盘
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓
//! run_batch (处理 Vec<Record>)
//!     ↓
//! workflow::FormDriver (处理单条 Record)
//!     ↓
//! services (能力层：probe / trigger / classifier / state_store)
//!     ↓
//! browser + infrastructure (基础设施：PageSession / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一写入者**：只有 run_batch 写账本
//! 2. **先落盘再继续**：第 N 条的状态写入先于第 N+1 条的提交
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod batch_processor;
pub mod run_batch;

// 重新导出主要类型
pub use batch_processor::App;
pub use run_batch::{run_batch, RunOptions};
