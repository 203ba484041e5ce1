use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::layout::Point;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

use crate::browser::network_tap::NetworkTap;
use crate::browser::{BrowserLauncher, FrameRef, NetworkSnapshot, PageSession};
use crate::config::Config;
use crate::error::DriverError;
use crate::infrastructure::js_executor::{js_arg, JsExecutor};

/// 每次提交启动一个独立的 Chromium 进程（独立的临时用户目录）
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    executable: Option<PathBuf>,
    request_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            headless: config.headless,
            executable: config.chrome_executable.as_ref().map(PathBuf::from),
            request_timeout: config.navigation_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError> {
        debug!("🚀 启动浏览器 (headless: {})", self.headless);

        let mut builder = BrowserConfig::builder()
            .request_timeout(self.request_timeout)
            .args(vec![
                "--disable-gpu",           // 无头模式下禁用 GPU
                "--no-sandbox",            // 容器内没有沙盒权限
                "--disable-dev-shm-usage", // 防止共享内存不足
            ]);
        builder = if self.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(|e| {
            error!("配置浏览器失败: {}", e);
            DriverError::LaunchFailed(e)
        })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动浏览器失败: {}", e);
            DriverError::LaunchFailed(e.to_string())
        })?;

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let opened = match browser.new_page("about:blank").await {
            Ok(page) => NetworkTap::attach(&page)
                .await
                .map(|tap| (page, tap))
                .map_err(|e| format!("监听网络事件失败: {}", e)),
            Err(e) => Err(format!("创建页面失败: {}", e)),
        };
        let (page, tap) = match opened {
            Ok(opened) => opened,
            Err(message) => {
                let session = ChromiumSession {
                    browser,
                    executor: None,
                    tap: None,
                    handler_task,
                };
                Box::new(session).close().await;
                return Err(DriverError::LaunchFailed(message));
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            executor: Some(JsExecutor::new(page)),
            tap: Some(tap),
            handler_task,
        }))
    }
}

/// 一个 Chromium 进程 + 一个页面
///
/// `Browser` 在 drop 时会结束子进程，`close()` 是正常路径上的显式释放
pub struct ChromiumSession {
    browser: Browser,
    executor: Option<JsExecutor>,
    tap: Option<NetworkTap>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    fn executor(&self) -> Result<&JsExecutor, DriverError> {
        self.executor
            .as_ref()
            .ok_or_else(|| DriverError::ScriptFailed("页面已关闭".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ClickTarget {
    ok: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct TextLookup {
    found: bool,
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawNetworkSnapshot {
    complete: bool,
    resources: u64,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.executor()?
            .page()
            .goto(url)
            .await
            .map_err(|e| DriverError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn find_frame(&self, url_fragment: &str) -> Result<Option<FrameRef>, DriverError> {
        let page = self.executor()?.page();
        for frame_id in page.frames().await? {
            if let Some(url) = page.frame_url(frame_id.clone()).await? {
                debug!("检查 iframe: {}", url);
                if url.contains(url_fragment) {
                    return Ok(Some(FrameRef {
                        id: frame_id.inner().clone(),
                        url,
                    }));
                }
            }
        }
        Ok(None)
    }

    async fn selector_present(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<bool, DriverError> {
        let js_code = format!("document.querySelector({}) !== null", js_arg(&selector)?);
        self.executor()?.eval_in_frame(&frame.id, js_code).await
    }

    async fn fill(&self, frame: &FrameRef, selector: &str, value: &str) -> Result<bool, DriverError> {
        let js_code = format!(
            r#"
            ((sel, value) => {{
                const el = document.querySelector(sel);
                if (!el) return false;
                el.focus();
                el.value = value;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                el.blur();
                return true;
            }})({}, {})
            "#,
            js_arg(&selector)?,
            js_arg(&value)?
        );
        self.executor()?.eval_in_frame(&frame.id, js_code).await
    }

    async fn click_interactive(&self, frame: &FrameRef, selector: &str) -> Result<(), DriverError> {
        // 计算按钮中心点在顶层页面中的坐标（逐层累加 iframe 偏移）
        let js_code = format!(
            r#"
            (async (sel) => {{
                const el = document.querySelector(sel);
                if (!el) return {{ ok: false, reason: 'not found' }};
                el.scrollIntoView({{ block: 'center', inline: 'center' }});
                if (typeof el.focus === 'function') el.focus();
                await new Promise(r => setTimeout(r, 500));
                const rect = el.getBoundingClientRect();
                if (rect.width === 0 || rect.height === 0) return {{ ok: false, reason: 'not visible' }};
                const cx = rect.left + rect.width / 2;
                const cy = rect.top + rect.height / 2;
                const top = document.elementFromPoint(cx, cy);
                if (!top || (top !== el && !el.contains(top))) return {{ ok: false, reason: 'obscured' }};
                let x = cx, y = cy, win = window;
                try {{
                    while (win.frameElement) {{
                        const fr = win.frameElement.getBoundingClientRect();
                        x += fr.left + win.frameElement.clientLeft;
                        y += fr.top + win.frameElement.clientTop;
                        win = win.parent;
                    }}
                }} catch (e) {{
                    return {{ ok: false, reason: 'cross-origin frame' }};
                }}
                return {{ ok: true, x, y, reason: '' }};
            }})({})
            "#,
            js_arg(&selector)?
        );

        let executor = self.executor()?;
        let target: ClickTarget = executor.eval_in_frame(&frame.id, js_code).await?;
        if !target.ok {
            return Err(DriverError::SubmitFailed(format!(
                "{} 无法直接点击: {}",
                selector, target.reason
            )));
        }

        executor.page().click(Point::new(target.x, target.y)).await?;
        Ok(())
    }

    async fn click_programmatic(&self, frame: &FrameRef, selector: &str) -> Result<(), DriverError> {
        let js_code = format!(
            r#"
            ((sel) => {{
                const btn = document.querySelector(sel);
                if (!btn) return false;
                btn.click();
                return true;
            }})({})
            "#,
            js_arg(&selector)?
        );
        let clicked: bool = self.executor()?.eval_in_frame(&frame.id, js_code).await?;
        if clicked {
            Ok(())
        } else {
            Err(DriverError::SubmitFailed(format!("{} 不存在", selector)))
        }
    }

    async fn network_snapshot(&self, frame: &FrameRef) -> Result<NetworkSnapshot, DriverError> {
        let js_code = r#"({
            complete: document.readyState === 'complete',
            resources: performance.getEntriesByType('resource').length
        })"#;
        let raw: RawNetworkSnapshot = self.executor()?.eval_in_frame(&frame.id, js_code).await?;
        let (inflight, activity) = self.tap.as_ref().map(NetworkTap::counts).unwrap_or_default();
        Ok(NetworkSnapshot {
            document_complete: raw.complete,
            resource_count: raw.resources,
            inflight,
            activity,
        })
    }

    async fn selector_text(
        &self,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<Option<String>, DriverError> {
        let js_code = format!(
            r#"
            ((sel) => {{
                const el = document.querySelector(sel);
                return el
                    ? {{ found: true, text: (el.innerText || el.textContent || '').trim() }}
                    : {{ found: false, text: '' }};
            }})({})
            "#,
            js_arg(&selector)?
        );
        let lookup: TextLookup = self.executor()?.eval_in_frame(&frame.id, js_code).await?;
        Ok(lookup.found.then_some(lookup.text))
    }

    async fn body_text(&self, frame: &FrameRef) -> Result<String, DriverError> {
        self.executor()?
            .eval_in_frame(&frame.id, "document.body ? document.body.innerText : ''")
            .await
    }

    async fn close(self: Box<Self>) {
        let ChromiumSession {
            mut browser,
            executor,
            tap,
            handler_task,
        } = *self;

        if let Some(tap) = tap {
            tap.detach();
        }

        if let Some(executor) = executor {
            if let Err(e) = executor.into_page().close().await {
                debug!("关闭页面失败: {}", e);
            }
        }
        if let Err(e) = browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("等待浏览器进程退出失败: {}", e);
        }
        handler_task.abort();
        debug!("浏览器已释放");
    }
}
