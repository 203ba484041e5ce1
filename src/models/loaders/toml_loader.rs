use crate::models::record::Record;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// 输入文件结构：
///
/// ```toml
/// [[records]]
/// numero_immatriculation = "GN-124-XM"
/// date_premiere_immat = "24/04/2023"
/// raison_sociale = "VOLKSWAGEN BANK"
/// ```
#[derive(Debug, Deserialize)]
struct RecordFile {
    #[serde(default)]
    records: Vec<toml::Table>,
}

/// 从 TOML 文件加载所有记录，保持文件中的顺序
pub async fn load_records(path: &Path, key_field: &str) -> Result<Vec<Record>> {
    if !path.exists() {
        anyhow::bail!("输入文件不存在: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取输入文件: {}", path.display()))?;

    let records = parse_records(&content, key_field)
        .with_context(|| format!("无法解析输入文件: {}", path.display()))?;

    tracing::info!(
        "成功加载 {} 条记录: {}",
        records.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(records)
}

/// 解析 TOML 文本为记录列表
pub fn parse_records(content: &str, key_field: &str) -> Result<Vec<Record>> {
    let file: RecordFile = toml::from_str(content)?;

    let records = file
        .records
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            let fields: BTreeMap<String, String> = table
                .into_iter()
                .filter_map(|(name, value)| scalar_to_string(&value).map(|v| (name, v)))
                .collect();
            let key = fields.get(key_field).cloned().unwrap_or_default();
            Record::new(index + 1, key, fields)
        })
        .collect();

    Ok(records)
}

/// 把标量值转成字符串；数组和表格被忽略
fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[records]]
numero_immatriculation = " AB-123-CD "
date_premiere_immat = "24/04/2023"
nom_prenom = ""

[[records]]
numero_immatriculation = ""
raison_sociale = "VOLKSWAGEN BANK"

[[records]]
raison_sociale = "ACME"
annee = 2023
"#;

    #[test]
    fn test_parse_records_keeps_order_and_trims() {
        let records = parse_records(SAMPLE, "numero_immatriculation").unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].row, 1);
        assert_eq!(records[0].key, "AB-123-CD");
        assert_eq!(records[0].field("date_premiere_immat"), Some("24/04/2023"));
        assert_eq!(records[0].field("nom_prenom"), None);

        assert!(!records[1].is_submittable());
        assert!(!records[2].is_submittable());
        assert_eq!(records[2].field("annee"), Some("2023"));
    }

    #[test]
    fn test_parse_records_empty_file() {
        let records = parse_records("", "numero_immatriculation").unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_load_records_missing_file() {
        let result = load_records(Path::new("does/not/exist.toml"), "numero_immatriculation").await;
        assert!(result.is_err());
    }
}
