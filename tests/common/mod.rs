//! 测试用的假浏览器
//!
//! 每次 `open()` 从队列中取出一个行为脚本；队列空了就使用默认行为（没有任何标记）

#![allow(dead_code)]

use async_trait::async_trait;
use siv_batch_submit::browser::{BrowserLauncher, FrameRef, NetworkSnapshot, PageSession};
use siv_batch_submit::error::DriverError;
use siv_batch_submit::Config;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const PRIMARY_SELECTOR: &str = "[name='rechercheDossier.numeroImmatriculation']";

pub const NO_MATCH_PAGE: &str =
    "Aucun dossier ne correspond à la recherche. L\u{2019}opération ne peut se poursuivre.";

/// 提交后页面的内容
#[derive(Debug, Clone, Default)]
pub enum Response {
    #[default]
    Nothing,
    Success,
    NoMatch,
    /// 同时出现成功与“无匹配”文案
    Both,
}

impl Response {
    fn body(&self) -> String {
        match self {
            Response::Nothing => "Recherche de dossier".to_string(),
            Response::Success => "Récapitulatif\nTitulaire Principal\nDUPONT JEAN".to_string(),
            Response::NoMatch => NO_MATCH_PAGE.to_string(),
            Response::Both => format!("Récapitulatif\n{}", NO_MATCH_PAGE),
        }
    }
}

/// 单次浏览上下文的行为
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    pub response: Response,
    pub navigation_hangs: bool,
    pub frame_missing: bool,
    pub interactive_blocked: bool,
    pub programmatic_blocked: bool,
    pub panic_on_fill: bool,
    /// 点击后服务器多久才响应；期间 iframe 保持旧文档（已加载完成）
    pub response_delay: Duration,
    /// 页面上始终有未完成的请求
    pub network_busy: bool,
}

impl Behaviour {
    pub fn respond(response: Response) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Opened,
    Navigated(String),
    Filled { selector: String, value: String },
    Clicked(&'static str),
    Closed,
}

#[derive(Clone, Default)]
pub struct FakeLauncher {
    behaviours: Arc<Mutex<VecDeque<Behaviour>>>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl FakeLauncher {
    pub fn new(behaviours: impl IntoIterator<Item = Behaviour>) -> Self {
        Self {
            behaviours: Arc::new(Mutex::new(behaviours.into_iter().collect())),
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    /// 按顺序列出实际提交过的登记号
    pub fn submitted_keys(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Filled { selector, value } if selector == PRIMARY_SELECTOR => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn filled_selectors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Filled { selector, .. } => Some(selector),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError> {
        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        self.events.lock().unwrap().push(Event::Opened);
        Ok(Box::new(FakeSession {
            behaviour,
            clicked_at: Mutex::new(None),
            events: self.events.clone(),
        }))
    }
}

struct FakeSession {
    behaviour: Behaviour,
    clicked_at: Mutex<Option<Instant>>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl FakeSession {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn click(&self, how: &'static str) {
        self.push(Event::Clicked(how));
        self.clicked_at.lock().unwrap().get_or_insert_with(Instant::now);
    }

    fn clicked(&self) -> bool {
        self.clicked_at.lock().unwrap().is_some()
    }

    /// 已点击且服务器已经响应
    fn responded(&self) -> bool {
        let clicked_at = *self.clicked_at.lock().unwrap();
        clicked_at.is_some_and(|at| at.elapsed() >= self.behaviour.response_delay)
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        if self.behaviour.navigation_hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.push(Event::Navigated(url.to_string()));
        Ok(())
    }

    async fn find_frame(&self, url_fragment: &str) -> Result<Option<FrameRef>, DriverError> {
        if self.behaviour.frame_missing {
            return Ok(None);
        }
        Ok(Some(FrameRef {
            id: "FRAME-1".to_string(),
            url: format!("https://siv.test/{}.do", url_fragment),
        }))
    }

    async fn selector_present(&self, _frame: &FrameRef, _selector: &str) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn fill(&self, _frame: &FrameRef, selector: &str, value: &str) -> Result<bool, DriverError> {
        if self.behaviour.panic_on_fill {
            panic!("fill exploded");
        }
        self.push(Event::Filled {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(true)
    }

    async fn click_interactive(&self, _frame: &FrameRef, selector: &str) -> Result<(), DriverError> {
        if self.behaviour.interactive_blocked {
            return Err(DriverError::SubmitFailed(format!("{} 无法直接点击: obscured", selector)));
        }
        self.click("interactive");
        Ok(())
    }

    async fn click_programmatic(&self, _frame: &FrameRef, selector: &str) -> Result<(), DriverError> {
        if self.behaviour.programmatic_blocked {
            return Err(DriverError::SubmitFailed(format!("{} 不存在", selector)));
        }
        self.click("programmatic");
        Ok(())
    }

    async fn network_snapshot(&self, _frame: &FrameRef) -> Result<NetworkSnapshot, DriverError> {
        let old_document = NetworkSnapshot {
            document_complete: true,
            resource_count: 4,
            inflight: 0,
            activity: 0,
        };
        let snapshot = if self.behaviour.network_busy {
            NetworkSnapshot {
                inflight: 1,
                activity: 1,
                ..old_document
            }
        } else if self.responded() {
            NetworkSnapshot {
                resource_count: 5,
                activity: 2,
                ..old_document
            }
        } else if self.clicked() {
            // POST 已发出，旧文档仍然完整、资源数不变
            NetworkSnapshot {
                inflight: 1,
                activity: 1,
                ..old_document
            }
        } else {
            old_document
        };
        Ok(snapshot)
    }

    async fn selector_text(&self, _frame: &FrameRef, _selector: &str) -> Result<Option<String>, DriverError> {
        Ok(None)
    }

    async fn body_text(&self, _frame: &FrameRef) -> Result<String, DriverError> {
        if self.responded() {
            Ok(self.behaviour.response.body())
        } else {
            Ok("Recherche de dossier".to_string())
        }
    }

    async fn close(self: Box<Self>) {
        self.push(Event::Closed);
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// 所有等待都很短的配置
pub fn test_config() -> Config {
    Config {
        target_url: "https://siv.test/".to_string(),
        navigation_timeout: ms(100),
        frame_timeout: ms(50),
        selector_timeout: ms(50),
        submit_timeout: ms(100),
        network_idle_timeout: ms(200),
        network_quiet_window: ms(0),
        probe_timeout: ms(30),
        poll_interval: ms(1),
        settle_delay: ms(0),
        record_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}
