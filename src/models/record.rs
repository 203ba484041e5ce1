use std::collections::BTreeMap;

/// 一条待查询的输入记录
///
/// 在一次运行中不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 在数据源中的行号（从1开始，仅用于日志）
    pub row: usize,
    /// 登记号（numero_immatriculation），已去除首尾空白
    pub key: String,
    /// 所有字段值（包括登记号本身），已去除首尾空白
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(row: usize, key: impl Into<String>, fields: BTreeMap<String, String>) -> Self {
        Self {
            row,
            key: key.into().trim().to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name, value.trim().to_string()))
                .collect(),
        }
    }

    /// 登记号为空的记录永远不会提交
    pub fn is_submittable(&self) -> bool {
        !self.key.is_empty()
    }

    /// 获取非空字段值
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// 状态账本中的键
    ///
    /// 登记号为空时使用行号，保证每一行都有且只有一条记录
    pub fn ledger_key(&self) -> String {
        if self.key.is_empty() {
            format!("#row-{}", self.row)
        } else {
            self.key.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, key: &str, extra: &[(&str, &str)]) -> Record {
        let fields = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Record::new(row, key, fields)
    }

    #[test]
    fn test_empty_key_is_not_submittable() {
        let r = record(2, "   ", &[]);
        assert!(!r.is_submittable());
        assert_eq!(r.ledger_key(), "#row-2");
    }

    #[test]
    fn test_field_ignores_blank_values() {
        let r = record(1, "AB-123-CD", &[("nom_prenom", "  "), ("date_certificat", " 24/04/2023 ")]);
        assert_eq!(r.field("nom_prenom"), None);
        assert_eq!(r.field("date_certificat"), Some("24/04/2023"));
        assert_eq!(r.field("raison_sociale"), None);
        assert_eq!(r.ledger_key(), "AB-123-CD");
    }
}
