//! Automator 宿主任务
//!
//! 每个目标页面一个任务，通过信箱接收提交请求，逐个执行并用 oneshot 回复。
//! 信箱的发送端全部被丢弃后任务结束；页面被重新安装时旧任务立即中止，
//! 手头的请求不会再触碰页面。

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::debug;

use crate::automator::driver::PageDriver;
use crate::automator::protocol::SubmissionProtocol;
use crate::dispatch::message::{SubmitReply, SubmitRequest, TargetHandle};
use crate::error::TransportError;

const MAILBOX_CAPACITY: usize = 8;

struct Envelope {
    request: SubmitRequest,
    reply: oneshot::Sender<SubmitReply>,
}

/// Automator 信箱（请求/回复通道的发送端）
#[derive(Clone)]
pub struct AutomatorMailbox {
    target: TargetHandle,
    tx: mpsc::Sender<Envelope>,
    task: AbortHandle,
}

impl AutomatorMailbox {
    pub fn target(&self) -> &TargetHandle {
        &self.target
    }

    /// 中止 Automator 任务，包括正在执行的请求
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// 发送请求并等待回复
    ///
    /// 请求未送达返回 `Unreachable`；送达后断开或超时分别返回 `Disconnected` / `Timeout`。
    pub async fn submit(
        &self,
        request: SubmitRequest,
        reply_timeout: Duration,
    ) -> Result<SubmitReply, TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TransportError::Unreachable {
                target: self.target.to_string(),
            })?;

        match timeout(reply_timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::Disconnected {
                target: self.target.to_string(),
            }),
            Err(_) => Err(TransportError::Timeout {
                target: self.target.to_string(),
                millis: reply_timeout.as_millis() as u64,
            }),
        }
    }
}

/// 启动一个绑定到 `target` 的 Automator 任务
pub fn spawn_automator<D>(target: TargetHandle, protocol: SubmissionProtocol<D>) -> AutomatorMailbox
where
    D: PageDriver + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Envelope>(MAILBOX_CAPACITY);
    let task_target = target.clone();

    let task = tokio::spawn(async move {
        debug!("Automator 已启动: {}", task_target);
        while let Some(envelope) = rx.recv().await {
            let reply = protocol.submit(&envelope.request).await;
            if envelope.reply.send(reply).is_err() {
                debug!("请求方已放弃等待回复: {}", task_target);
            }
        }
        debug!("Automator 已退出: {}", task_target);
    });

    AutomatorMailbox {
        target,
        tx,
        task: task.abort_handle(),
    }
}
