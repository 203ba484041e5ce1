//! 浏览器能力接口
//!
//! 表单协议只依赖这里的 trait，具体实现见 `headless`

pub mod headless;
pub mod network_tap;

use crate::error::DriverError;
use async_trait::async_trait;

pub use headless::ChromiumLauncher;

/// 承载表单的 iframe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    pub id: String,
    pub url: String,
}

/// 网络状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSnapshot {
    /// iframe 的 `document.readyState == "complete"`
    pub document_complete: bool,
    /// iframe 已加载的资源条目数
    pub resource_count: u64,
    /// 页面上已发出、尚未完成或失败的请求数
    pub inflight: u64,
    /// 网络事件总数（发出 + 完成 + 失败），任何网络活动都会使它增加
    pub activity: u64,
}

impl NetworkSnapshot {
    /// 没有进行中的请求，且 iframe 文档已加载完成
    pub fn is_settled(&self) -> bool {
        self.document_complete && self.inflight == 0
    }

    /// 两次快照之间没有任何网络活动
    pub fn same_activity(&self, other: &NetworkSnapshot) -> bool {
        self.resource_count == other.resource_count && self.activity == other.activity
    }
}

/// 每次提交获取一个全新的、隔离的浏览上下文
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError>;
}

/// 一个浏览上下文中的单个页面
///
/// 每个方法只做一次尝试，等待与超时由调用方负责
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// 查找地址包含 `url_fragment` 的 iframe
    async fn find_frame(&self, url_fragment: &str) -> Result<Option<FrameRef>, DriverError>;

    async fn selector_present(&self, frame: &FrameRef, selector: &str)
        -> Result<bool, DriverError>;

    /// 填写字段；元素不存在时返回 `false`
    async fn fill(&self, frame: &FrameRef, selector: &str, value: &str)
        -> Result<bool, DriverError>;

    /// 滚动到可见、聚焦、真实鼠标点击；元素被遮挡时报错
    async fn click_interactive(&self, frame: &FrameRef, selector: &str)
        -> Result<(), DriverError>;

    /// 通过脚本触发同一个元素的 click()
    async fn click_programmatic(&self, frame: &FrameRef, selector: &str)
        -> Result<(), DriverError>;

    async fn network_snapshot(&self, frame: &FrameRef) -> Result<NetworkSnapshot, DriverError>;

    /// 元素存在时返回其文本
    async fn selector_text(&self, frame: &FrameRef, selector: &str)
        -> Result<Option<String>, DriverError>;

    async fn body_text(&self, frame: &FrameRef) -> Result<String, DriverError>;

    /// 释放浏览上下文
    async fn close(self: Box<Self>);
}
