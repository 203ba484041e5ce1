use siv_batch_submit::config::Config;
use siv_batch_submit::logger;
use siv_batch_submit::models::Record;
use siv_batch_submit::workflow::{AttemptCtx, FormDriver, Submitter};
use siv_batch_submit::{BrowserLauncher, ChromiumLauncher, Classifier, PageSession, RawOutcome};

#[tokio::test]
#[ignore] // 默认忽略，需要真实的 Chromium 与 TARGET_URL：cargo test -- --ignored
async fn test_submit_single_record() {
    // 初始化日志
    logger::init(true, None);

    // 加载配置
    let config = Config::from_env();
    config.validate().expect("配置不完整");

    // 登记号来自环境变量，避免写死真实数据
    let key = std::env::var("LIVE_TEST_KEY").expect("需要设置 LIVE_TEST_KEY");
    let fields = [(config.key_field.clone(), key.clone())].into_iter().collect();
    let record = Record::new(1, key, fields);

    let driver = FormDriver::new(ChromiumLauncher::new(&config), &config);
    let attempt = driver
        .submit(&record, &AttemptCtx::new(1, 1, &record))
        .await
        .expect("提交失败");

    let classifier = Classifier::new(&config.no_match_phrases).unwrap();
    let result = classifier.classify(&attempt.outcome);
    println!("结果: {} {:?}", result.status, result.detail);

    assert!(
        matches!(attempt.outcome, RawOutcome::Signals(_)),
        "表单流程应该走完: {:?}",
        attempt.outcome
    );
}

#[tokio::test]
#[ignore]
async fn test_browser_launch() {
    // 初始化日志
    logger::init(true, None);

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器启动
    let session = ChromiumLauncher::new(&config).open().await;

    assert!(session.is_ok(), "应该能够成功启动浏览器");
    if let Ok(session) = session {
        session.close().await;
    }
}
