use anyhow::Result;
use siv_batch_submit::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init(config.verbose_logging, Some(&config.output_log_file));

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
