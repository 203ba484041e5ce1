use crate::models::outcome::{DriverFailure, Step};
use std::time::Duration;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 表单驱动错误
///
/// 只在驱动内部流动，在协议边界转换成 `DriverFailure`
#[derive(Debug, Error)]
pub enum DriverError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    NavigationFailed { url: String, message: String },
    /// 找不到承载表单的 iframe
    #[error("form context not found (iframe 地址片段: {fragment})")]
    FormContextNotFound { fragment: String },
    /// 找不到字段
    #[error("找不到字段 {field} ({selector})")]
    FieldNotFound { field: String, selector: String },
    /// 所有提交策略都失败
    #[error("无法触发提交: {0}")]
    SubmitFailed(String),
    /// iframe 当前没有可用的执行上下文（通常正在跳转）
    #[error("iframe {frame_id} 没有可用的执行上下文")]
    FrameDetached { frame_id: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptFailed(String),
    /// 有界等待超时
    #[error("{step}超时 ({}ms){detail}", .after.as_millis())]
    Timeout {
        step: Step,
        after: Duration,
        /// 超时前最后一次轮询错误，已格式化
        detail: String,
    },
}

impl DriverError {
    pub fn timeout(step: Step, after: Duration) -> Self {
        DriverError::Timeout {
            step,
            after,
            detail: String::new(),
        }
    }

    /// 超时并附带最后一次轮询错误
    pub fn timeout_after_error(step: Step, after: Duration, last_error: Option<String>) -> Self {
        DriverError::Timeout {
            step,
            after,
            detail: last_error
                .map(|e| format!(", 最后一次错误: {}", e))
                .unwrap_or_default(),
        }
    }

    /// 转换成可分类的驱动失败
    pub fn into_failure(self, step: Step) -> DriverFailure {
        let step = match &self {
            DriverError::Timeout { step, .. } => *step,
            _ => step,
        };
        DriverFailure::new(step, self.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::ScriptFailed(err.to_string())
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("序列化失败 ({path}): {source}")]
    SerializeFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("环境变量 {var_name} 未设置")]
    Missing { var_name: String },
    /// 值无法解析
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    Invalid {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_keeps_its_own_step() {
        let err = DriverError::timeout_after_error(
            Step::FieldReady,
            Duration::from_millis(1500),
            Some("no node".into()),
        );
        let failure = err.into_failure(Step::Unexpected);
        assert_eq!(failure.step, Step::FieldReady);
        assert!(failure.message.contains("1500ms"));
        assert!(failure.message.contains("no node"));
    }

    #[test]
    fn test_form_context_message() {
        let failure = DriverError::FormContextNotFound {
            fragment: "csa_retour_dem_certificat".into(),
        }
        .into_failure(Step::FormContext);
        assert_eq!(failure.step, Step::FormContext);
        assert!(failure.message.starts_with("form context not found"));
    }
}
