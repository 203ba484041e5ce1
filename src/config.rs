use crate::error::ConfigError;
use crate::models::status::Status;
use crate::services::trigger::TriggerStrategy;
use std::time::Duration;

/// 表单字段名（与输入文件中的列名一致）
pub const FIELD_NAMES: [&str; 5] = [
    "numero_immatriculation",
    "date_premiere_immat",
    "date_certificat",
    "nom_prenom",
    "raison_sociale",
];

/// 程序配置
///
/// 所有值都来自环境变量，没有任何内置凭据
#[derive(Clone, Debug)]
pub struct Config {
    // --- 目标表单 ---
    /// 入口地址（必填）
    pub target_url: String,
    /// 承载表单的 iframe 地址中包含的片段
    pub frame_url_fragment: String,
    /// 作为登记号的字段名
    pub key_field: String,
    /// 字段名 → 选择器；`None` 表示不填写
    pub field_selectors: Vec<(String, Option<String>)>,
    pub submit_selector: String,
    pub success_selector: Option<String>,
    /// 成功关键字（`|` 分隔）
    pub success_text: Vec<String>,
    pub error_selector: Option<String>,
    /// 错误关键字（`|` 分隔）
    pub error_text: Vec<String>,
    /// 表示“没有匹配记录”的已知文案
    pub no_match_phrases: Vec<String>,
    /// 依次尝试的提交策略
    pub trigger_strategies: Vec<TriggerStrategy>,

    // --- 超时 ---
    pub navigation_timeout: Duration,
    pub frame_timeout: Duration,
    pub selector_timeout: Duration,
    pub submit_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub network_quiet_window: Duration,
    pub probe_timeout: Duration,
    pub poll_interval: Duration,
    /// 填写完毕后、提交之前的等待
    pub settle_delay: Duration,
    /// 单条记录的总时限
    pub record_timeout: Duration,

    // --- 浏览器 ---
    pub headless: bool,
    pub chrome_executable: Option<String>,

    // --- 文件 ---
    pub input_file: String,
    pub output_dir: String,
    pub state_file: String,
    /// 忽略已有账本，从头开始
    pub fresh: bool,
    /// 续跑时需要重新提交的状态
    pub retry_statuses: Vec<Status>,

    // --- 日志与通知 ---
    pub verbose_logging: bool,
    pub output_log_file: String,
    pub notify_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            frame_url_fragment: "csa_retour_dem_certificat".to_string(),
            key_field: FIELD_NAMES[0].to_string(),
            field_selectors: vec![
                field("numero_immatriculation", "rechercheDossier.numeroImmatriculation"),
                field("date_premiere_immat", "rechercheDossier.datePremImmat"),
                field("date_certificat", "rechercheDossier.dateCi"),
                field("nom_prenom", "rechercheDossier.nomEtPrenom"),
                field("raison_sociale", "rechercheDossier.raisonSociale"),
            ],
            submit_selector: "input[type='submit'], button[type='submit']".to_string(),
            success_selector: None,
            success_text: vec!["Récapitulatif".to_string(), "Titulaire Principal".to_string()],
            error_selector: None,
            error_text: vec!["Aucun dossier ne correspond".to_string()],
            no_match_phrases: vec!["Aucun dossier ne correspond".to_string()],
            trigger_strategies: vec![TriggerStrategy::Interactive, TriggerStrategy::Programmatic],
            navigation_timeout: Duration::from_millis(60_000),
            frame_timeout: Duration::from_millis(20_000),
            selector_timeout: Duration::from_millis(60_000),
            submit_timeout: Duration::from_millis(20_000),
            network_idle_timeout: Duration::from_millis(60_000),
            network_quiet_window: Duration::from_millis(500),
            probe_timeout: Duration::from_millis(5_000),
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_millis(1_500),
            record_timeout: Duration::from_millis(300_000),
            headless: true,
            chrome_executable: None,
            input_file: "entries.toml".to_string(),
            output_dir: "results_final".to_string(),
            state_file: "results_final/run_state.jsonl".to_string(),
            fresh: false,
            retry_statuses: Vec::new(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            notify_webhook_url: None,
        }
    }
}

fn field(name: &str, input_name: &str) -> (String, Option<String>) {
    (name.to_string(), Some(format!("[name='{}']", input_name)))
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置，未设置或无法解析的值使用默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let millis = |name: &str, fallback: Duration| {
            text(name)
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        let flag = |name: &str, fallback: bool| {
            text(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(fallback)
        };
        let list = |name: &str, fallback: Vec<String>| {
            text(name).map(|v| split_list(&v)).unwrap_or(fallback)
        };

        let field_selectors = default
            .field_selectors
            .iter()
            .map(|(name, selector)| {
                // 显式设置为 "-" 表示不填写该字段
                let value = match lookup(&format!("SEL_{}", name)) {
                    Some(v) if v.trim() == "-" => None,
                    Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
                    _ => selector.clone(),
                };
                (name.clone(), value)
            })
            .collect();

        Self {
            target_url: text("TARGET_URL").unwrap_or(default.target_url),
            frame_url_fragment: text("FRAME_URL_FRAGMENT").unwrap_or(default.frame_url_fragment),
            key_field: text("KEY_FIELD").unwrap_or(default.key_field),
            field_selectors,
            submit_selector: text("SUBMIT_SELECTOR").unwrap_or(default.submit_selector),
            success_selector: text("SUCCESS_SELECTOR").or(default.success_selector),
            success_text: list("SUCCESS_TEXT", default.success_text),
            error_selector: text("ERROR_SELECTOR").or(default.error_selector),
            error_text: list("ERROR_TEXT", default.error_text),
            no_match_phrases: list("NO_MATCH_PHRASES", default.no_match_phrases),
            trigger_strategies: text("TRIGGER_STRATEGIES")
                .and_then(|v| TriggerStrategy::parse_list(&v).ok())
                .unwrap_or(default.trigger_strategies),
            navigation_timeout: millis("NAVIGATION_TIMEOUT_MS", default.navigation_timeout),
            frame_timeout: millis("FRAME_TIMEOUT_MS", default.frame_timeout),
            selector_timeout: millis("SELECTOR_TIMEOUT_MS", default.selector_timeout),
            submit_timeout: millis("SUBMIT_TIMEOUT_MS", default.submit_timeout),
            network_idle_timeout: millis("NETWORK_IDLE_TIMEOUT_MS", default.network_idle_timeout),
            network_quiet_window: millis("NETWORK_QUIET_MS", default.network_quiet_window),
            probe_timeout: millis("PROBE_TIMEOUT_MS", default.probe_timeout),
            poll_interval: millis("POLL_INTERVAL_MS", default.poll_interval),
            settle_delay: millis("SETTLE_DELAY_MS", default.settle_delay),
            record_timeout: millis("RECORD_TIMEOUT_MS", default.record_timeout),
            headless: flag("HEADLESS", default.headless),
            chrome_executable: text("CHROME_EXECUTABLE").or(default.chrome_executable),
            input_file: text("INPUT_FILE").unwrap_or(default.input_file),
            output_dir: text("OUTPUT_DIR").unwrap_or(default.output_dir),
            state_file: text("STATE_FILE").unwrap_or(default.state_file),
            fresh: flag("FRESH", default.fresh),
            retry_statuses: text("RETRY_STATUSES")
                .map(|v| split_list(&v).iter().filter_map(|s| s.parse().ok()).collect())
                .unwrap_or(default.retry_statuses),
            verbose_logging: flag("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: text("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            notify_webhook_url: text("NOTIFY_WEBHOOK_URL").or(default.notify_webhook_url),
        }
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "TARGET_URL".to_string(),
            });
        }
        if self.primary_selector().is_none() {
            return Err(ConfigError::Missing {
                var_name: format!("SEL_{}", self.key_field),
            });
        }
        if self.trigger_strategies.is_empty() {
            return Err(ConfigError::Missing {
                var_name: "TRIGGER_STRATEGIES".to_string(),
            });
        }
        if self.success_selector.is_none() && self.success_text.is_empty() {
            return Err(ConfigError::Missing {
                var_name: "SUCCESS_SELECTOR / SUCCESS_TEXT".to_string(),
            });
        }
        if self.error_selector.is_none() && self.error_text.is_empty() {
            return Err(ConfigError::Missing {
                var_name: "ERROR_SELECTOR / ERROR_TEXT".to_string(),
            });
        }
        Ok(())
    }

    /// 登记号字段的选择器，也是表单就绪的信号
    pub fn primary_selector(&self) -> Option<&str> {
        self.field_selectors
            .iter()
            .find(|(name, _)| *name == self.key_field)
            .and_then(|(_, selector)| selector.as_deref())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults_need_target_url() {
        let config = config_from(&[]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { ref var_name }) if var_name == "TARGET_URL"
        ));
        assert_eq!(config.navigation_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("TARGET_URL", "https://example.test/form"),
            ("SEL_nom_prenom", "-"),
            ("SEL_date_certificat", "#dateCi"),
            ("NAVIGATION_TIMEOUT_MS", "1500"),
            ("NO_MATCH_PHRASES", "Aucun dossier | Aucun résultat"),
            ("RETRY_STATUSES", "technical_error|bogus"),
            ("TRIGGER_STRATEGIES", "programmatic"),
            ("HEADLESS", "false"),
        ]);

        assert!(config.validate().is_ok());
        assert_eq!(config.navigation_timeout, Duration::from_millis(1500));
        assert_eq!(config.no_match_phrases, vec!["Aucun dossier", "Aucun résultat"]);
        assert_eq!(config.retry_statuses, vec![Status::TechnicalError]);
        assert_eq!(config.trigger_strategies, vec![TriggerStrategy::Programmatic]);
        assert!(!config.headless);

        let selectors: HashMap<_, _> = config.field_selectors.iter().cloned().collect();
        assert_eq!(selectors["nom_prenom"], None);
        assert_eq!(selectors["date_certificat"].as_deref(), Some("#dateCi"));
        assert_eq!(
            config.primary_selector(),
            Some("[name='rechercheDossier.numeroImmatriculation']")
        );
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = config_from(&[("PROBE_TIMEOUT_MS", "soon"), ("FRESH", "maybe")]);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert!(!config.fresh);
    }
}
