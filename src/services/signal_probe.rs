//! 结果标记探针 - 业务能力层
//!
//! 目标页面没有结构化的响应，只能靠选择器 / 文本判断成功或失败。
//! 探针是可替换的：分类逻辑只关心“哪个标记命中了”

use crate::browser::{FrameRef, PageSession};
use crate::config::Config;
use crate::models::outcome::MarkerHit;
use crate::utils::wait::poll_until;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// 探针：在限定时间内检测某个标记是否出现
///
/// 未出现不是错误，返回 `None`
#[async_trait]
pub trait SignalProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
        limit: Duration,
        interval: Duration,
    ) -> Option<MarkerHit>;
}

/// 选择器探针：元素存在（且文本包含 `text`，如果设置了）即命中
#[derive(Debug, Clone)]
pub struct SelectorProbe {
    name: String,
    selector: String,
    text: Option<String>,
}

impl SelectorProbe {
    pub fn new(name: impl Into<String>, selector: impl Into<String>, text: Option<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            text,
        }
    }
}

#[async_trait]
impl SignalProbe for SelectorProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
        limit: Duration,
        interval: Duration,
    ) -> Option<MarkerHit> {
        let selector = self.selector.as_str();
        let wanted = self.text.as_deref();
        let hit = poll_until(limit, interval, move || async move {
            let text = session.selector_text(frame, selector).await?;
            Ok(text.filter(|t| wanted.map_or(true, |w| t.contains(w))))
        })
        .await;

        match hit {
            Ok(text) => Some(MarkerHit::new(&self.name, text)),
            Err(timeout) => {
                debug!(
                    "探针 {} 未命中 ({}){}",
                    self.name,
                    self.selector,
                    timeout
                        .last_error
                        .map(|e| format!(": {}", e))
                        .unwrap_or_default()
                );
                None
            }
        }
    }
}

/// 文本探针：iframe 正文包含任一关键字即命中
#[derive(Debug, Clone)]
pub struct TextProbe {
    name: String,
    needles: Vec<String>,
}

impl TextProbe {
    pub fn new(name: impl Into<String>, needles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            needles,
        }
    }
}

#[async_trait]
impl SignalProbe for TextProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(
        &self,
        session: &dyn PageSession,
        frame: &FrameRef,
        limit: Duration,
        interval: Duration,
    ) -> Option<MarkerHit> {
        if self.needles.is_empty() {
            return None;
        }
        let needles = self.needles.as_slice();
        let hit = poll_until(limit, interval, move || async move {
            let body = session.body_text(frame).await?;
            Ok(needles
                .iter()
                .find(|needle| body.contains(needle.as_str()))
                .cloned())
        })
        .await;

        match hit {
            Ok(needle) => Some(MarkerHit::new(&self.name, needle)),
            Err(_) => {
                debug!("探针 {} 未命中 (关键字: {:?})", self.name, self.needles);
                None
            }
        }
    }
}

/// 依次运行一组探针，返回第一个命中的标记
pub async fn first_hit(
    probes: &[Box<dyn SignalProbe>],
    session: &dyn PageSession,
    frame: &FrameRef,
    limit: Duration,
    interval: Duration,
) -> Option<MarkerHit> {
    for probe in probes {
        if let Some(hit) = probe.probe(session, frame, limit, interval).await {
            return Some(hit);
        }
    }
    None
}

/// 根据配置构建成功探针与错误探针
///
/// 同时设置了选择器与关键字时，关键字只在该元素内匹配；
/// 只设置其中之一时，分别检测元素是否存在或正文是否包含关键字
pub fn probes_from_config(
    config: &Config,
) -> (Vec<Box<dyn SignalProbe>>, Vec<Box<dyn SignalProbe>>) {
    let build = |kind: &str, selector: &Option<String>, text: &[String]| {
        let mut probes: Vec<Box<dyn SignalProbe>> = Vec::new();
        match selector {
            Some(selector) if !text.is_empty() => {
                for needle in text {
                    probes.push(Box::new(SelectorProbe::new(
                        format!("{}_selector", kind),
                        selector.clone(),
                        Some(needle.clone()),
                    )));
                }
            }
            Some(selector) => probes.push(Box::new(SelectorProbe::new(
                format!("{}_selector", kind),
                selector.clone(),
                None,
            ))),
            None if !text.is_empty() => probes.push(Box::new(TextProbe::new(
                format!("{}_text", kind),
                text.to_vec(),
            ))),
            None => {}
        }
        probes
    };

    (
        build("success", &config.success_selector, &config.success_text),
        build("error", &config.error_selector, &config.error_text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probes_from_default_config_use_text() {
        let (success, error) = probes_from_config(&Config::default());
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].name(), "success_text");
        assert_eq!(error[0].name(), "error_text");
    }

    #[test]
    fn test_probes_from_config_with_selectors() {
        let config = Config {
            error_selector: Some(".erreur".to_string()),
            error_text: Vec::new(),
            ..Config::default()
        };
        let (success, error) = probes_from_config(&config);
        assert_eq!(success.len(), 1);
        assert_eq!(error.len(), 1);
        assert_eq!(error[0].name(), "error_selector");
    }

    #[test]
    fn test_selector_with_text_matches_inside_the_element() {
        let config = Config {
            success_selector: Some("#recap".to_string()),
            success_text: vec!["Récapitulatif".to_string(), "Titulaire".to_string()],
            ..Config::default()
        };
        let (success, error) = probes_from_config(&config);
        assert_eq!(success.len(), 2);
        assert!(success.iter().all(|p| p.name() == "success_selector"));
        assert_eq!(error[0].name(), "error_text");
    }

    #[tokio::test]
    async fn test_selector_marker_requires_text_inside_element() {
        use crate::browser::NetworkSnapshot;
        use crate::error::DriverError;

        /// 页面上只有一个 `#recap` 元素
        struct OneElement;

        #[async_trait]
        impl PageSession for OneElement {
            async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
                Ok(())
            }
            async fn find_frame(&self, _fragment: &str) -> Result<Option<FrameRef>, DriverError> {
                Ok(None)
            }
            async fn selector_present(&self, _f: &FrameRef, _s: &str) -> Result<bool, DriverError> {
                Ok(true)
            }
            async fn fill(&self, _f: &FrameRef, _s: &str, _v: &str) -> Result<bool, DriverError> {
                Ok(true)
            }
            async fn click_interactive(&self, _f: &FrameRef, _s: &str) -> Result<(), DriverError> {
                Ok(())
            }
            async fn click_programmatic(&self, _f: &FrameRef, _s: &str) -> Result<(), DriverError> {
                Ok(())
            }
            async fn network_snapshot(&self, _f: &FrameRef) -> Result<NetworkSnapshot, DriverError> {
                Ok(NetworkSnapshot {
                    document_complete: true,
                    resource_count: 0,
                    inflight: 0,
                    activity: 0,
                })
            }
            async fn selector_text(
                &self,
                _f: &FrameRef,
                selector: &str,
            ) -> Result<Option<String>, DriverError> {
                Ok((selector == "#recap").then(|| "Recherche de dossier".to_string()))
            }
            async fn body_text(&self, _f: &FrameRef) -> Result<String, DriverError> {
                Ok("Récapitulatif".to_string())
            }
            async fn close(self: Box<Self>) {}
        }

        let frame = FrameRef {
            id: "F".to_string(),
            url: "https://siv.test/form.do".to_string(),
        };
        let limit = Duration::from_millis(20);
        let interval = Duration::from_millis(1);

        let paired = SelectorProbe::new("success_selector", "#recap", Some("Récapitulatif".to_string()));
        assert!(paired.probe(&OneElement, &frame, limit, interval).await.is_none());

        let bare = SelectorProbe::new("success_selector", "#recap", None);
        let hit = bare.probe(&OneElement, &frame, limit, interval).await.unwrap();
        assert_eq!(hit.probe, "success_selector");
    }
}
