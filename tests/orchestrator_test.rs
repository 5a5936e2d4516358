use async_trait::async_trait;
use prompt_queue_submit::dispatch::{
    AutomatorLink, DispatchPolicy, SubmitReply, SubmitRequest, TargetHandle,
};
use prompt_queue_submit::error::{QueueError, TransportError};
use prompt_queue_submit::orchestrator::{
    LogLevel, MemoryStore, Orchestrator, OrchestratorHandle, Phase, QueueState, StateSnapshot,
    UiEvent,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::{sleep, timeout};

/// 脚本化的 Automator 连接
///
/// 按顺序返回预设结果，用完后一律返回成功；可选的闸门让投递停在半路。
#[derive(Default)]
struct ScriptedLink {
    replies: Mutex<VecDeque<Result<SubmitReply, TransportError>>>,
    submitted: Mutex<Vec<String>>,
    attaches: Mutex<usize>,
    gate: Option<Arc<Semaphore>>,
    no_target: bool,
}

impl ScriptedLink {
    fn with_replies(replies: Vec<Result<SubmitReply, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn attaches(&self) -> usize {
        *self.attaches.lock().unwrap()
    }
}

#[async_trait]
impl AutomatorLink for ScriptedLink {
    async fn active_target(&self) -> Result<TargetHandle, TransportError> {
        if self.no_target {
            return Err(TransportError::AttachFailed {
                reason: "没有打开的页面".into(),
            });
        }
        Ok(TargetHandle::new("tab-1"))
    }

    async fn attach(&self, _target: &TargetHandle) -> Result<(), TransportError> {
        *self.attaches.lock().unwrap() += 1;
        Ok(())
    }

    async fn submit(
        &self,
        _target: &TargetHandle,
        request: &SubmitRequest,
    ) -> Result<SubmitReply, TransportError> {
        self.submitted.lock().unwrap().push(request.prompt.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SubmitReply::ok()))
    }
}

fn fast_policy() -> DispatchPolicy {
    DispatchPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
    }
}

fn prompts(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_string()).collect()
}

async fn spawn_with(link: Arc<ScriptedLink>, store: Arc<MemoryStore>) -> OrchestratorHandle {
    Orchestrator::spawn(store, link, fast_policy()).await
}

async fn wait_for(
    handle: &OrchestratorHandle,
    pred: impl Fn(&StateSnapshot) -> bool,
) -> StateSnapshot {
    timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = handle.get_state().await.unwrap();
            if pred(&snapshot) {
                return snapshot;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("等待状态超时")
}

async fn wait_for_submits(link: &ScriptedLink, count: usize) {
    timeout(Duration::from_secs(5), async {
        while link.submitted().len() < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("等待投递超时")
}

fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn runs_every_prompt_in_order_until_finished() {
    let link = Arc::new(ScriptedLink::default());
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_with(link.clone(), store.clone()).await;
    let mut events = handle.subscribe();

    handle.start(prompts(&["p1", "p2"]), 1000, true).await.unwrap();
    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;

    assert_eq!(done.cursor, 2);
    assert_eq!(done.total, 2);
    assert_eq!(link.submitted(), vec!["p1", "p2"]);
    assert_eq!(link.attaches(), 1);
    assert_eq!(store.saved().unwrap().phase, Phase::Finished);

    let cursors: Vec<usize> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            UiEvent::StateUpdate(s) => Some(s.cursor),
            UiEvent::Log(_) => None,
        })
        .collect();
    assert!(cursors.windows(2).all(|w| w[0] <= w[1]), "{:?}", cursors);
    assert_eq!(cursors.last(), Some(&2));
}

#[tokio::test]
async fn logical_failure_stops_at_the_failing_prompt() {
    let link = Arc::new(ScriptedLink::with_replies(vec![
        Ok(SubmitReply::ok()),
        Ok(SubmitReply::failed("NotFound: 输入框")),
    ]));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle
        .start(prompts(&["p1", "p2", "p3"]), 500, false)
        .await
        .unwrap();
    let failed = wait_for(&handle, |s| s.phase == Phase::Error).await;

    assert_eq!(failed.cursor, 1);
    assert!(failed.last_error.unwrap().contains("NotFound"));
    // 逻辑失败不重试，后续提示词也不再投递
    sleep(Duration::from_millis(50)).await;
    assert_eq!(link.submitted(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn unreachable_automator_is_retried_then_escalates() {
    let unreachable = || -> Result<SubmitReply, TransportError> {
        Err(TransportError::Unreachable {
            target: "tab-1".into(),
        })
    };
    let link = Arc::new(ScriptedLink::with_replies(vec![unreachable(), unreachable()]));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["p1", "p2"]), 500, false).await.unwrap();
    let failed = wait_for(&handle, |s| s.phase == Phase::Error).await;

    assert_eq!(failed.cursor, 0);
    assert_eq!(link.submitted(), vec!["p1", "p1"]);
}

#[tokio::test]
async fn single_unreachable_attempt_recovers() {
    let link = Arc::new(ScriptedLink::with_replies(vec![Err(
        TransportError::Unreachable {
            target: "tab-1".into(),
        },
    )]));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["p1"]), 500, false).await.unwrap();
    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;

    assert_eq!(done.cursor, 1);
    assert_eq!(link.submitted(), vec!["p1", "p1"]);
}

#[tokio::test]
async fn delivered_request_is_not_retried_after_timeout() {
    let link = Arc::new(ScriptedLink::with_replies(vec![Err(TransportError::Timeout {
        target: "tab-1".into(),
        millis: 180_000,
    })]));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["p1", "p2"]), 500, false).await.unwrap();
    wait_for(&handle, |s| s.phase == Phase::Error).await;

    assert_eq!(link.submitted(), vec!["p1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_lets_the_current_prompt_finish_then_holds() {
    let gate = Arc::new(Semaphore::new(0));
    let link = Arc::new(ScriptedLink::gated(gate.clone()));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle
        .start(prompts(&["p1", "p2", "p3"]), 500, false)
        .await
        .unwrap();
    handle.pause().await.unwrap();

    // 暂停前已经发出的第一个提示词照常投递
    wait_for_submits(&link, 1).await;
    gate.add_permits(1);

    let paused = wait_for(&handle, |s| s.cursor == 1).await;
    assert_eq!(paused.phase, Phase::Paused);

    sleep(Duration::from_millis(100)).await;
    let still = handle.get_state().await.unwrap();
    assert_eq!(still.phase, Phase::Paused);
    assert_eq!(still.cursor, 1);
    assert_eq!(link.submitted(), vec!["p1"]);

    handle.resume().await.unwrap();
    gate.add_permits(2);
    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;
    assert_eq!(done.cursor, 3);
    assert_eq!(link.submitted(), vec!["p1", "p2", "p3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_right_after_start_never_skips_the_first_prompt() {
    for _ in 0..100 {
        // 只放行第一个提示词，运行不会在 pause 之前结束
        let gate = Arc::new(Semaphore::new(1));
        let link = Arc::new(ScriptedLink::gated(gate.clone()));
        let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

        handle.start(prompts(&["p1", "p2"]), 500, false).await.unwrap();
        handle.pause().await.unwrap();

        let settled = wait_for(&handle, |s| s.cursor >= 1).await;
        assert_eq!(settled.phase, Phase::Paused);
        assert_eq!(link.submitted().first().map(String::as_str), Some("p1"));
        gate.add_permits(1);
    }
}

#[tokio::test]
async fn stop_resets_the_queue_and_drops_the_in_flight_result() {
    let gate = Arc::new(Semaphore::new(0));
    let link = Arc::new(ScriptedLink::gated(gate.clone()));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["p1", "p2"]), 500, false).await.unwrap();
    wait_for_submits(&link, 1).await;

    handle.stop().await.unwrap();
    let stopped = handle.get_state().await.unwrap();
    assert_eq!(stopped.phase, Phase::Idle);
    assert_eq!(stopped.total, 0);
    assert_eq!(stopped.cursor, 0);
    assert!(stopped.active_prompt_preview.is_empty());

    gate.add_permits(5);
    sleep(Duration::from_millis(100)).await;
    let after = handle.get_state().await.unwrap();
    assert_eq!(after.phase, Phase::Idle);
    assert_eq!(after.cursor, 0);
    assert_eq!(link.submitted(), vec!["p1"]);
}

#[tokio::test]
async fn stop_from_paused_returns_to_idle() {
    let gate = Arc::new(Semaphore::new(0));
    let link = Arc::new(ScriptedLink::gated(gate.clone()));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["p1", "p2"]), 500, false).await.unwrap();
    handle.pause().await.unwrap();
    handle.stop().await.unwrap();

    assert_eq!(handle.get_state().await.unwrap().phase, Phase::Idle);
    gate.add_permits(5);
}

#[tokio::test]
async fn new_run_after_stop_waits_for_the_old_step() {
    let gate = Arc::new(Semaphore::new(0));
    let link = Arc::new(ScriptedLink::gated(gate.clone()));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    handle.start(prompts(&["old"]), 500, false).await.unwrap();
    wait_for_submits(&link, 1).await;
    handle.stop().await.unwrap();

    handle.start(prompts(&["new"]), 500, false).await.unwrap();
    gate.add_permits(5);

    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;
    assert_eq!(done.cursor, 1);
    assert_eq!(done.total, 1);
    assert_eq!(link.submitted(), vec!["old", "new"]);
}

#[tokio::test]
async fn commands_in_the_wrong_phase_are_rejected_without_change() {
    let gate = Arc::new(Semaphore::new(0));
    let link = Arc::new(ScriptedLink::gated(gate.clone()));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    assert!(matches!(
        handle.pause().await,
        Err(QueueError::WrongPhase { phase: Phase::Idle, .. })
    ));
    assert!(handle.resume().await.is_err());
    assert!(handle.stop().await.is_err());
    assert_eq!(handle.get_state().await.unwrap().phase, Phase::Idle);

    handle.start(prompts(&["p1"]), 500, false).await.unwrap();
    assert!(matches!(
        handle.start(prompts(&["other"]), 500, false).await,
        Err(QueueError::WrongPhase { command: "start", .. })
    ));
    assert!(handle.resume().await.is_err());

    gate.add_permits(1);
    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;
    assert_eq!(done.total, 1);
    assert!(handle.pause().await.is_err());
    assert_eq!(handle.get_state().await.unwrap().phase, Phase::Finished);
}

#[tokio::test]
async fn empty_prompt_list_is_rejected() {
    let link = Arc::new(ScriptedLink::default());
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;

    let result = handle.start(prompts(&["", "   "]), 500, false).await;
    assert_eq!(result, Err(QueueError::EmptyPrompts));
    assert_eq!(handle.get_state().await.unwrap().phase, Phase::Idle);
    assert!(link.submitted().is_empty());
}

#[tokio::test]
async fn start_fails_when_no_target_page_is_available() {
    let link = Arc::new(ScriptedLink {
        no_target: true,
        ..Default::default()
    });
    let handle = spawn_with(link, Arc::new(MemoryStore::new())).await;

    let result = handle.start(prompts(&["p1"]), 500, false).await;
    assert!(matches!(result, Err(QueueError::TargetUnavailable(_))));
    assert_eq!(handle.get_state().await.unwrap().phase, Phase::Idle);
}

#[tokio::test]
async fn interrupted_run_is_restored_as_idle() {
    let saved = QueueState {
        phase: Phase::Running,
        prompts: prompts(&["p1", "p2"]),
        cursor: 1,
        active_prompt_preview: "p2".into(),
        delay_ms: 1000,
        auto_download_enabled: true,
        target_handle: Some(TargetHandle::new("tab-1")),
        last_error: None,
    };
    let store = Arc::new(MemoryStore::with_state(saved));
    let link = Arc::new(ScriptedLink::default());
    let handle = spawn_with(link.clone(), store.clone()).await;

    let restored = handle.get_state().await.unwrap();
    assert_eq!(restored.phase, Phase::Idle);
    assert_eq!(restored.cursor, 1);
    assert_eq!(restored.total, 2);
    assert_eq!(store.saved().unwrap().phase, Phase::Idle);

    // 恢复后不会自动继续
    sleep(Duration::from_millis(50)).await;
    assert!(link.submitted().is_empty());
}

#[tokio::test]
async fn download_warning_is_logged_and_the_queue_advances() {
    let link = Arc::new(ScriptedLink::with_replies(vec![Ok(
        SubmitReply::ok().with_warning("下载失败: 下载按钮未出现"),
    )]));
    let handle = spawn_with(link.clone(), Arc::new(MemoryStore::new())).await;
    let mut events = handle.subscribe();

    handle.start(prompts(&["p1", "p2"]), 500, true).await.unwrap();
    let done = wait_for(&handle, |s| s.phase == Phase::Finished).await;
    assert_eq!(done.cursor, 2);

    let warnings: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            UiEvent::Log(log) if log.level == LogLevel::Warning => Some(log.message),
            _ => None,
        })
        .collect();
    assert!(warnings.iter().any(|m| m.contains("下载失败")), "{:?}", warnings);
}

#[tokio::test]
async fn delay_is_clamped_before_dispatch() {
    let link = Arc::new(ScriptedLink::default());
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_with(link, store.clone()).await;

    handle.start(prompts(&["p1"]), 50, false).await.unwrap();
    wait_for(&handle, |s| s.phase == Phase::Finished).await;
    assert_eq!(store.saved().unwrap().delay_ms, 500);
}
