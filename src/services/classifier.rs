//! 结果分类器
//!
//! 纯函数：原始信号 → 状态。优先级（先匹配先生效）：
//! 1. 驱动失败 → technical_error
//! 2. 错误标记 → 已知“无匹配”文案为 logical_error，否则 technical_error
//! 3. 成功标记 → ok
//! 4. 都没有 → unknown
//!
//! 两个标记同时出现时错误优先

use crate::models::outcome::{RawOutcome, SignalVerdict};
use crate::models::status::Status;
use regex::Regex;

/// 分类结果：状态 + 诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: Status,
    pub detail: Option<String>,
}

impl Classification {
    pub fn new(status: Status, detail: Option<String>) -> Self {
        Self { status, detail }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    /// “无匹配”文案：忽略大小写，单词之间允许任意空白
    no_match_patterns: Vec<Regex>,
}

impl Classifier {
    pub fn new(phrases: &[String]) -> Result<Self, regex::Error> {
        let no_match_patterns = phrases
            .iter()
            .map(|phrase| normalize_quotes(phrase))
            .filter(|phrase| !phrase.trim().is_empty())
            .map(|phrase| {
                let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
                Regex::new(&format!("(?i){}", words.join(r"\s+")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { no_match_patterns })
    }

    pub fn classify(&self, outcome: &RawOutcome) -> Classification {
        let signals = match outcome {
            RawOutcome::Failure(failure) => {
                return Classification::new(Status::TechnicalError, Some(failure.to_string()));
            }
            RawOutcome::Signals(signals) => signals,
        };

        match signals.verdict() {
            SignalVerdict::Error => {
                let marker = signals.error.as_ref().map(|hit| hit.text.as_str());
                let observed = marker.into_iter().chain(signals.page_text.as_deref());
                let detail = marker.map(|text| truncate(text, 200));
                for text in observed {
                    if self.is_no_match(text) {
                        return Classification::new(Status::LogicalError, detail);
                    }
                }
                Classification::new(
                    Status::TechnicalError,
                    Some(format!(
                        "未识别的错误标记: {}",
                        detail.unwrap_or_default()
                    )),
                )
            }
            SignalVerdict::Success => Classification::new(Status::Ok, None),
            SignalVerdict::Indeterminate => Classification::new(
                Status::Unknown,
                Some("未检测到成功或错误标记".to_string()),
            ),
        }
    }

    /// 文本是否包含已知的“无匹配”文案
    pub fn is_no_match(&self, text: &str) -> bool {
        let text = normalize_quotes(text);
        self.no_match_patterns
            .iter()
            .any(|pattern| pattern.is_match(&text))
    }
}

/// 统一弯撇号
fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

fn truncate(text: &str, max_len: usize) -> String {
    crate::utils::logging::truncate_text(text.trim(), max_len)
}
