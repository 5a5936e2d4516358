//! 有界轮询等待
//!
//! 以固定间隔调用探测函数，直到返回 `Some` 或超过最长等待时间。
//! 探测出错（例如页面重新渲染时脚本上下文被销毁）视为"还没找到"，继续轮询。
//! 取消方式：丢弃返回的 future（整个步骤被丢弃时等待也随之结束）。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// 轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollSpec {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }
}

/// 轮询直到探测成功
///
/// # 返回
/// - `Some(v)`: 探测到结果
/// - `None`: 超过最长等待时间
pub async fn poll_until<T, E, F, Fut>(spec: PollSpec, mut probe: F) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + spec.max_wait;
    loop {
        match probe().await {
            Ok(Some(found)) => return Some(found),
            Ok(None) => {}
            Err(e) => debug!("探测失败，继续等待: {}", e),
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(spec.interval.min(deadline - now)).await;
    }
}
