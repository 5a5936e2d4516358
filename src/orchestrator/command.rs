//! 命令通道（UI → Orchestrator）

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::QueueError;
use crate::orchestrator::events::{EventBus, UiEvent};
use crate::orchestrator::state::StateSnapshot;

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    Start {
        prompts: Vec<String>,
        delay_ms: u64,
        auto_download: bool,
        reply: Reply<Result<(), QueueError>>,
    },
    Pause {
        reply: Reply<Result<(), QueueError>>,
    },
    Resume {
        reply: Reply<Result<(), QueueError>>,
    },
    Stop {
        reply: Reply<Result<(), QueueError>>,
    },
    GetState {
        reply: Reply<StateSnapshot>,
    },
}

/// 命令回复（`{success}` / `{success: false, error}`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), QueueError>> for CommandResponse {
    fn from(result: Result<(), QueueError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// 调度器句柄
///
/// 可以随意克隆；所有句柄都被丢弃后调度器任务结束。
#[derive(Clone)]
pub struct OrchestratorHandle {
    pub(crate) tx: mpsc::Sender<Command>,
    pub(crate) events: EventBus,
}

impl OrchestratorHandle {
    pub async fn start(
        &self,
        prompts: Vec<String>,
        delay_ms: u64,
        auto_download: bool,
    ) -> Result<(), QueueError> {
        self.request(|reply| Command::Start {
            prompts,
            delay_ms,
            auto_download,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> Result<(), QueueError> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), QueueError> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    pub async fn stop(&self) -> Result<(), QueueError> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    pub async fn get_state(&self) -> Result<StateSnapshot, QueueError> {
        self.request(|reply| Command::GetState { reply }).await
    }

    /// 订阅状态和日志事件
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| QueueError::OrchestratorGone)?;
        reply_rx.await.map_err(|_| QueueError::OrchestratorGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::state::Phase;

    #[test]
    fn response_shape() {
        let ok = CommandResponse::from(Ok(()));
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"success":true}"#);

        let rejected = CommandResponse::from(Err(QueueError::WrongPhase {
            command: "pause",
            phase: Phase::Idle,
        }));
        assert!(!rejected.success);
        assert_eq!(
            rejected.error.as_deref(),
            Some("当前状态为 idle，无法执行 pause")
        );
    }
}
