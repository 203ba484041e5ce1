use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 单条记录的最终状态
///
/// 每条记录在一次运行中有且只有一个状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// 查询成功
    Ok,
    /// 目标系统明确返回“没有匹配的记录”
    LogicalError,
    /// 网络、超时、选择器缺失或其它意外错误
    TechnicalError,
    /// 登记号为空，未提交
    Skipped,
    /// 提交完成，但既没有成功标记也没有错误标记
    Unknown,
}

impl Status {
    /// 报表中使用的顺序
    pub const ALL: [Status; 5] = [
        Status::Ok,
        Status::LogicalError,
        Status::TechnicalError,
        Status::Skipped,
        Status::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::LogicalError => "logical_error",
            Status::TechnicalError => "technical_error",
            Status::Skipped => "skipped",
            Status::Unknown => "unknown",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Status::LogicalError | Status::TechnicalError)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("未知状态: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&Status::LogicalError).unwrap(),
            "\"logical_error\""
        );
        let parsed: Status = serde_json::from_str("\"technical_error\"").unwrap();
        assert_eq!(parsed, Status::TechnicalError);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("unknown".parse::<Status>().unwrap(), Status::Unknown);
        assert_eq!(" skipped ".parse::<Status>().unwrap(), Status::Skipped);
        assert!("error".parse::<Status>().is_err());
    }
}
