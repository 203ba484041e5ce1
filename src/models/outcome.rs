//! 一次提交尝试的原始结果
//!
//! 驱动只报告“哪些信号出现了”，不决定最终状态

use std::fmt;
use std::time::{Duration, Instant};

/// 表单协议中的步骤，用于标注失败发生的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Launch,
    Navigation,
    FormContext,
    FieldReady,
    Fill,
    Submit,
    NetworkIdle,
    Probe,
    Unexpected,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Launch => "启动浏览器",
            Step::Navigation => "页面导航",
            Step::FormContext => "定位表单 iframe",
            Step::FieldReady => "等待主字段",
            Step::Fill => "填写字段",
            Step::Submit => "提交表单",
            Step::NetworkIdle => "等待网络空闲",
            Step::Probe => "探测结果标记",
            Step::Unexpected => "表单流程",
        };
        f.write_str(name)
    }
}

/// 某个探针命中的标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerHit {
    /// 探针名称
    pub probe: String,
    /// 命中元素（或页面）的文本
    pub text: String,
}

impl MarkerHit {
    pub fn new(probe: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
            text: text.into(),
        }
    }
}

/// 提交后观察到的信号
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub success: Option<MarkerHit>,
    pub error: Option<MarkerHit>,
    /// 错误标记出现时抓取的 iframe 正文
    pub page_text: Option<String>,
}

/// 信号的优先级判定：错误 > 成功 > 不确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalVerdict {
    Error,
    Success,
    Indeterminate,
}

impl Signals {
    pub fn verdict(&self) -> SignalVerdict {
        if self.error.is_some() {
            SignalVerdict::Error
        } else if self.success.is_some() {
            SignalVerdict::Success
        } else {
            SignalVerdict::Indeterminate
        }
    }
}

/// 驱动层失败（导航、iframe 缺失、字段缺失、超时……）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFailure {
    pub step: Step,
    pub message: String,
}

impl DriverFailure {
    pub fn new(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}失败: {}", self.step, self.message)
    }
}

/// 驱动返回的原始结果，总是可以被分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    Signals(Signals),
    Failure(DriverFailure),
}

/// 一条记录的一次提交尝试
///
/// 分类完成后即丢弃，只有状态会被保存
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    pub key: String,
    /// 实际填写的字段 (字段名, 值)
    pub sent_fields: Vec<(String, String)>,
    pub started_at: Instant,
    pub outcome: RawOutcome,
}

impl SubmissionAttempt {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_error_wins_over_success() {
        let signals = Signals {
            success: Some(MarkerHit::new("success", "Récapitulatif")),
            error: Some(MarkerHit::new("error", "Aucun dossier")),
            page_text: None,
        };
        assert_eq!(signals.verdict(), SignalVerdict::Error);
    }

    #[test]
    fn test_verdict_indeterminate_without_markers() {
        assert_eq!(Signals::default().verdict(), SignalVerdict::Indeterminate);
    }
}
