//! 有界轮询
//!
//! 所有外部等待（iframe 出现、字段就绪、网络空闲、结果标记）都走这里，
//! 超时总会得到一个确定的结果

use crate::error::DriverError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// 轮询超时，携带最后一次检查时的错误
#[derive(Debug)]
pub struct PollTimeout {
    pub last_error: Option<String>,
}

/// 反复调用 `check` 直到返回 `Some`，或超过 `limit`
///
/// `check` 报错视为“尚未就绪”，继续轮询
pub async fn poll_until<T, F, Fut>(
    limit: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, PollTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, DriverError>>,
{
    let mut last_error = None;
    let polled = timeout(limit, async {
        loop {
            match check().await {
                Ok(Some(value)) => return value,
                Ok(None) => {}
                Err(e) => last_error = Some(e.to_string()),
            }
            sleep(interval).await;
        }
    })
    .await;

    polled.map_err(|_| PollTimeout { last_error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_until_returns_first_ready_value() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let value = poll_until(Duration::from_secs(1), Duration::from_millis(1), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(if n >= 2 { Some(n) } else { None })
        })
        .await
        .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_times_out_with_last_error() {
        let result: Result<(), _> =
            poll_until(Duration::from_millis(30), Duration::from_millis(5), || async {
                Err(DriverError::ScriptFailed("boom".into()))
            })
            .await;
        let err = result.unwrap_err();
        assert!(err.last_error.unwrap().contains("boom"));
    }
}
