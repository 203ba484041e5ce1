//! tracing 初始化
//!
//! 同时输出到终端和日志文件；`RUST_LOG` 优先于 `verbose`

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool, log_file: Option<&str>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("无法打开日志文件 {}: {}", path, e))
            .ok()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false);

    // 重复初始化（例如测试中）时忽略错误
    let _ = match file {
        Some(file) => builder
            .with_writer(std::io::stdout.and(Mutex::new(file)))
            .try_init(),
        None => builder.try_init(),
    };
}
