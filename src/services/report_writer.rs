//! 报表写入服务 - 业务能力层
//!
//! 运行结束后把汇总写成 JSON 文件，只写，不参与续跑判断

use crate::error::{AppError, AppResult, FileError};
use crate::models::record::Record;
use crate::models::run_state::RunState;
use crate::models::status::Status;
use crate::models::summary::RunSummary;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub const SUMMARY_FILE: &str = "summary_report.json";
pub const ERRORS_FILE: &str = "errors_only.json";

/// 写出的报表路径
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub errors: PathBuf,
}

/// 出错记录（逻辑错误或技术错误）
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRow {
    pub key: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// 输入中的原始字段，便于人工复核后重新提交
    pub fields: BTreeMap<String, String>,
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub async fn write(
        &self,
        summary: &RunSummary,
        state: &RunState,
        records: &[Record],
    ) -> AppResult<ReportPaths> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let paths = ReportPaths {
            summary: self.output_dir.join(SUMMARY_FILE),
            errors: self.output_dir.join(ERRORS_FILE),
        };

        write_json(&paths.summary, &summary_json(summary, &paths)).await?;
        write_json(&paths.errors, &error_rows(summary, state, records)).await?;

        info!("📄 报表已写入: {}", paths.summary.display());
        Ok(paths)
    }
}

/// `summary_report.json` 的内容
pub fn summary_json(summary: &RunSummary, paths: &ReportPaths) -> JsonValue {
    let mut report = Map::new();
    report.insert("run_timestamp".into(), summary.run_timestamp().into());
    report.insert("total_processed".into(), summary.total().into());
    for (status, count) in summary.counts() {
        report.insert(status.as_str().into(), count.into());
    }
    report.insert("resumed".into(), summary.resumed().into());

    let detailed: Map<String, JsonValue> = Status::ALL
        .into_iter()
        .map(|status| (status.as_str().to_string(), summary.keys(status).into()))
        .collect();
    report.insert("detailed_lists".into(), detailed.into());

    let mut files = Map::new();
    files.insert("summary".into(), paths.summary.display().to_string().into());
    files.insert("errors_only".into(), paths.errors.display().to_string().into());
    report.insert("output_files".into(), files.into());

    JsonValue::Object(report)
}

/// 按输入顺序列出所有出错记录，附带账本中的诊断信息与输入字段
///
/// 重复的登记号取第一次出现的那一行
pub fn error_rows(summary: &RunSummary, state: &RunState, records: &[Record]) -> Vec<ErrorRow> {
    let mut by_key: HashMap<String, &Record> = HashMap::new();
    for record in records {
        by_key.entry(record.ledger_key()).or_insert(record);
    }

    Status::ALL
        .into_iter()
        .filter(|status| status.is_error())
        .flat_map(|status| {
            let by_key = &by_key;
            summary.keys(status).iter().map(move |key| ErrorRow {
                key: key.clone(),
                status,
                detail: state.entries.get(key).and_then(|entry| entry.detail.clone()),
                fields: by_key
                    .get(key)
                    .map(|record| record.fields.clone())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| FileError::SerializeFailed {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Record;
    use crate::models::run_state::StateEntry;
    use crate::models::summary::SummaryBuilder;

    #[tokio::test]
    async fn test_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = RunState::new();
        state.insert(
            "EF-456-GH",
            StateEntry::new(Status::LogicalError, Some("Aucun dossier ne correspond".into())),
        );

        let fields = |key: &str| {
            [
                ("numero_immatriculation".to_string(), key.to_string()),
                ("raison_sociale".to_string(), "VOLKSWAGEN BANK".to_string()),
            ]
            .into_iter()
            .collect()
        };
        let records = vec![
            Record::new(1, "AB-123-CD", fields("AB-123-CD")),
            Record::new(2, "EF-456-GH", fields("EF-456-GH")),
            Record::new(3, "", Default::default()),
        ];

        let mut builder = SummaryBuilder::new(state.run_timestamp.clone());
        builder.add(&records[0], Status::Ok);
        builder.add(&records[1], Status::LogicalError);
        builder.add(&records[2], Status::Skipped);
        let summary = builder.finish();

        let writer = ReportWriter::new(dir.path().join("out"));
        let paths = writer.write(&summary, &state, &records).await.unwrap();

        let report: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&paths.summary).unwrap()).unwrap();
        assert_eq!(report["total_processed"], 3);
        assert_eq!(report["ok"], 1);
        assert_eq!(report["logical_error"], 1);
        assert_eq!(report["technical_error"], 0);
        assert_eq!(report["detailed_lists"]["skipped"][0], "#row-3");

        let errors: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&paths.errors).unwrap()).unwrap();
        assert_eq!(errors.as_array().unwrap().len(), 1);
        assert_eq!(errors[0]["key"], "EF-456-GH");
        assert_eq!(errors[0]["detail"], "Aucun dossier ne correspond");
        assert_eq!(errors[0]["fields"]["numero_immatriculation"], "EF-456-GH");
        assert_eq!(errors[0]["fields"]["raison_sociale"], "VOLKSWAGEN BANK");
    }
}
