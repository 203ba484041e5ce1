//! 页面网络活动计数
//!
//! 订阅 CDP 的请求事件，记录进行中的请求。表单 POST 进行期间 iframe 仍显示旧文档，
//! 只看 `readyState` 无法知道服务器是否已经响应

use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::DriverError;

/// 按请求 ID 记录的网络状态
///
/// 重定向沿用同一个请求 ID，只在最终完成或失败时移除
#[derive(Debug, Default)]
pub struct TapState {
    inflight: HashSet<String>,
    activity: u64,
}

impl TapState {
    pub fn begin(&mut self, request_id: &str) {
        self.inflight.insert(request_id.to_string());
        self.activity += 1;
    }

    pub fn end(&mut self, request_id: &str) {
        self.inflight.remove(request_id);
        self.activity += 1;
    }

    pub fn inflight(&self) -> u64 {
        self.inflight.len() as u64
    }

    pub fn activity(&self) -> u64 {
        self.activity
    }
}

/// 挂在页面上的网络监听
pub struct NetworkTap {
    state: Arc<Mutex<TapState>>,
    task: JoinHandle<()>,
}

impl NetworkTap {
    pub async fn attach(page: &Page) -> Result<Self, DriverError> {
        page.execute(EnableParams::default()).await?;

        let mut sent = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut finished = page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = page.event_listener::<EventLoadingFailed>().await?;

        let state = Arc::new(Mutex::new(TapState::default()));
        let shared = state.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = sent.next() => {
                        trace!("请求发出: {}", event.request.url);
                        update(&shared, |s| s.begin(event.request_id.inner()));
                    }
                    Some(event) = finished.next() => {
                        update(&shared, |s| s.end(event.request_id.inner()));
                    }
                    Some(event) = failed.next() => {
                        update(&shared, |s| s.end(event.request_id.inner()));
                    }
                    else => break,
                }
            }
        });

        Ok(Self { state, task })
    }

    /// (进行中的请求数, 网络事件总数)
    pub fn counts(&self) -> (u64, u64) {
        self.state
            .lock()
            .map(|s| (s.inflight(), s.activity()))
            .unwrap_or((0, 0))
    }

    pub fn detach(self) {
        self.task.abort();
    }
}

fn update(state: &Mutex<TapState>, apply: impl FnOnce(&mut TapState)) {
    if let Ok(mut guard) = state.lock() {
        apply(&mut guard);
    }
}
