//! 调度重试策略

use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::dispatch::link::AutomatorLink;
use crate::dispatch::message::{SubmitReply, SubmitRequest, TargetHandle};
use crate::error::TransportError;

/// 最大投递次数
pub const DISPATCH_MAX_ATTEMPTS: usize = 2;
/// 两次投递之间的固定等待
pub const DISPATCH_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DISPATCH_MAX_ATTEMPTS,
            backoff: DISPATCH_BACKOFF,
        }
    }
}

/// 投递请求，请求未送达时按策略重试
///
/// 只有 `TransportError::Unreachable` 会重试；请求一旦送达，
/// 无论断开还是超时都直接返回，避免同一个提示词被提交两次。
pub async fn dispatch_with_retry(
    link: &dyn AutomatorLink,
    target: &TargetHandle,
    request: &SubmitRequest,
    policy: DispatchPolicy,
) -> Result<SubmitReply, TransportError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match link.submit(target, request).await {
            Ok(reply) => return Ok(reply),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(
                    "⚠️ 投递失败 (尝试 {}/{}): {}，{}ms 后重试...",
                    attempt,
                    attempts,
                    e,
                    policy.backoff.as_millis()
                );
                sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 按顺序返回预设结果的连接
    struct Scripted {
        results: Mutex<Vec<Result<SubmitReply, TransportError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<SubmitReply, TransportError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl AutomatorLink for Scripted {
        async fn active_target(&self) -> Result<TargetHandle, TransportError> {
            Ok(TargetHandle::new("tab"))
        }
        async fn attach(&self, _: &TargetHandle) -> Result<(), TransportError> {
            Ok(())
        }
        async fn submit(
            &self,
            _: &TargetHandle,
            _: &SubmitRequest,
        ) -> Result<SubmitReply, TransportError> {
            *self.calls.lock().unwrap() += 1;
            self.results.lock().unwrap().pop().expect("no scripted result left")
        }
    }

    fn unreachable() -> TransportError {
        TransportError::Unreachable {
            target: "tab".into(),
        }
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            prompt: "p".into(),
            delay_ms: 500,
            auto_download: false,
        }
    }

    fn fast() -> DispatchPolicy {
        DispatchPolicy {
            max_attempts: DISPATCH_MAX_ATTEMPTS,
            backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn retries_unreachable_once_then_succeeds() {
        let link = Scripted::new(vec![Err(unreachable()), Ok(SubmitReply::ok())]);
        let reply = dispatch_with_retry(&link, &TargetHandle::new("tab"), &request(), fast()).await;
        tokio_test::assert_ok!(&reply);
        assert_eq!(link.calls(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let link = Scripted::new(vec![Err(unreachable()), Err(unreachable())]);
        let reply = dispatch_with_retry(&link, &TargetHandle::new("tab"), &request(), fast()).await;
        assert_eq!(reply, Err(unreachable()));
        assert_eq!(link.calls(), 2);
    }

    #[tokio::test]
    async fn delivered_request_is_never_retried() {
        let timeout = TransportError::Timeout {
            target: "tab".into(),
            millis: 1000,
        };
        let link = Scripted::new(vec![Err(timeout.clone())]);
        let reply = dispatch_with_retry(&link, &TargetHandle::new("tab"), &request(), fast()).await;
        assert_eq!(reply, Err(timeout));
        assert_eq!(link.calls(), 1);
    }

    #[tokio::test]
    async fn logical_failure_is_returned_as_reply() {
        let link = Scripted::new(vec![Ok(SubmitReply::failed("NotFound"))]);
        let reply = dispatch_with_retry(&link, &TargetHandle::new("tab"), &request(), fast())
            .await
            .unwrap();
        assert!(!reply.success);
        assert_eq!(link.calls(), 1);
    }
}
