//! 提交触发策略
//!
//! 按顺序尝试，第一个不报错的策略即视为提交成功

use crate::browser::{FrameRef, PageSession};
use crate::error::{ConfigError, DriverError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStrategy {
    /// 滚动到可见位置、聚焦，然后在元素中心真实点击
    Interactive,
    /// 通过脚本调用元素的 click()
    Programmatic,
}

impl TriggerStrategy {
    /// 解析逗号分隔的策略列表，例如 `interactive,programmatic`
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ConfigError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }

    /// 对同一个提交按钮执行本策略
    pub async fn fire(
        self,
        session: &dyn PageSession,
        frame: &FrameRef,
        selector: &str,
    ) -> Result<(), DriverError> {
        match self {
            TriggerStrategy::Interactive => session.click_interactive(frame, selector).await,
            TriggerStrategy::Programmatic => session.click_programmatic(frame, selector).await,
        }
    }
}

impl fmt::Display for TriggerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStrategy::Interactive => f.write_str("interactive"),
            TriggerStrategy::Programmatic => f.write_str("programmatic"),
        }
    }
}

impl FromStr for TriggerStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" | "click" => Ok(TriggerStrategy::Interactive),
            "programmatic" | "js" => Ok(TriggerStrategy::Programmatic),
            other => Err(ConfigError::Invalid {
                var_name: "TRIGGER_STRATEGIES".to_string(),
                value: other.to_string(),
                expected_type: "interactive | programmatic".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_keeps_order() {
        let list = TriggerStrategy::parse_list("programmatic, interactive").unwrap();
        assert_eq!(
            list,
            vec![TriggerStrategy::Programmatic, TriggerStrategy::Interactive]
        );
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        assert!(TriggerStrategy::parse_list("interactive,double-click").is_err());
    }
}
