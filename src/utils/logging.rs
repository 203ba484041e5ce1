use anyhow::Result;
/// 日志工具模块
///
/// 提供运行日志格式化和输出的辅助函数
use std::fs;
use std::path::Path;
use tracing::info;

use crate::models::status::Status;
use crate::models::summary::RunSummary;

/// 初始化日志文件（写入文件头）
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let log_header = format!(
        "{}\n批量查询日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(target_url: &str, headless: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 顺序批量查询模式");
    info!("🌐 目标地址: {}", target_url);
    info!("🖥️ 无头模式: {}", headless);
    info!("{}", "=".repeat(60));
}

/// 记录加载信息
pub fn log_records_loaded(total: usize, already_resolved: usize) {
    info!("✓ 找到 {} 条记录", total);
    if already_resolved > 0 {
        info!("♻️ 其中 {} 条已在账本中，将直接沿用", already_resolved);
    }
    info!("💡 逐条处理，每条完成后立即保存状态\n");
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("总计: {} (沿用账本: {})", summary.total(), summary.resumed());
    for (status, count) in summary.counts() {
        info!("{} {}: {}", status_icon(status), status, count);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Ok => "✅",
        Status::LogicalError => "⚠️",
        Status::TechnicalError => "❌",
        Status::Skipped => "⏭️",
        Status::Unknown => "❓",
    }
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
