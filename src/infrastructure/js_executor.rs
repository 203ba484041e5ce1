//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露“在某个 iframe 里执行 JS”的能力

use crate::error::DriverError;
use chromiumoxide::cdp::browser_protocol::page::FrameId;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源
/// - 每次执行前重新解析 iframe 的执行上下文（提交后 iframe 会跳转，旧上下文失效）
/// - 不认识记录 / 字段 / 状态
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于导航、鼠标事件等其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 取回 page（用于关闭）
    pub fn into_page(self) -> Page {
        self.page
    }

    /// 在指定 iframe 中执行 JS 并反序列化结果
    ///
    /// 表达式必须返回一个非 undefined / null 的值
    pub async fn eval_in_frame<T: DeserializeOwned>(
        &self,
        frame_id: &str,
        js_code: impl Into<String>,
    ) -> Result<T, DriverError> {
        let context_id = self
            .page
            .frame_execution_context(FrameId::new(frame_id))
            .await?
            .ok_or_else(|| DriverError::FrameDetached {
                frame_id: frame_id.to_string(),
            })?;

        let js_code = js_code.into();
        trace!("iframe {} 执行 JS: {}", frame_id, js_code);

        let params = EvaluateParams::builder()
            .expression(js_code)
            .context_id(context_id)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(DriverError::ScriptFailed)?;

        let result = self.page.evaluate_expression(params).await?;
        result
            .into_value::<T>()
            .map_err(|e| DriverError::ScriptFailed(e.to_string()))
    }
}

/// 把参数编码为 JS 字面量
pub fn js_arg(value: &impl Serialize) -> Result<String, DriverError> {
    serde_json::to_string(value).map_err(|e| DriverError::ScriptFailed(e.to_string()))
}
