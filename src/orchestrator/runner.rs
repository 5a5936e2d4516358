//! 队列调度器 - 编排层核心
//!
//! ## 职责
//!
//! 持有 `QueueState`，按顺序处理命令和步骤结果，驱动"提交 → 等待 → 前进"循环。
//!
//! ## 运行方式
//!
//! - 单个任务顺序处理两类消息：UI 命令、内部消息（推进 / 步骤完成）
//! - 每个步骤在独立任务中执行（安装 Automator + 投递请求），完成后把结果发回信箱
//! - 同一时间最多一个步骤在执行
//! - 每次状态修改后持久化并广播 `stateUpdate`
//! - pause / stop 不会打断正在执行的步骤，在步骤结果返回后生效

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dispatch::{dispatch_with_retry, AutomatorLink, DispatchPolicy, SubmitRequest, TargetHandle};
use crate::error::QueueError;
use crate::orchestrator::command::{Command, OrchestratorHandle};
use crate::orchestrator::events::{EventBus, LogLevel};
use crate::orchestrator::state::{Phase, QueueState, StateSnapshot};
use crate::orchestrator::store::StateStore;
use crate::utils::truncate_text;

const COMMAND_CAPACITY: usize = 32;

/// 步骤结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepOutcome {
    Completed { warning: Option<String> },
    Failed(String),
}

enum Internal {
    /// 处理下一个提示词
    Advance { run_id: u64 },
    /// 步骤执行结束
    StepFinished { run_id: u64, outcome: StepOutcome },
}

/// 队列调度器
pub struct Orchestrator {
    state: QueueState,
    store: Arc<dyn StateStore>,
    link: Arc<dyn AutomatorLink>,
    events: EventBus,
    policy: DispatchPolicy,
    /// 每次 start 递增，用来识别旧运行遗留的步骤结果
    run_id: u64,
    /// 正在执行的步骤属于哪次运行
    in_flight: Option<u64>,
    /// 本次运行是否还需要安装 Automator
    needs_attach: bool,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl Orchestrator {
    /// 读取持久化状态（进行中的运行降级为 idle），启动调度器任务
    pub async fn spawn(
        store: Arc<dyn StateStore>,
        link: Arc<dyn AutomatorLink>,
        policy: DispatchPolicy,
    ) -> OrchestratorHandle {
        let events = EventBus::new();
        let state = match store.load().await {
            Ok(Some(saved)) => {
                let restored = saved.restored();
                info!(
                    "📂 已恢复上次的队列状态: {} ({}/{})",
                    restored.phase,
                    restored.cursor,
                    restored.prompts.len()
                );
                restored
            }
            Ok(None) => QueueState::default(),
            Err(e) => {
                error!("读取队列状态失败，使用空状态: {}", e);
                QueueState::default()
            }
        };

        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            state,
            store,
            link,
            events: events.clone(),
            policy,
            run_id: 0,
            in_flight: None,
            needs_attach: false,
            internal_tx,
            internal_rx,
        };

        // 恢复后的状态（可能已降级）写回
        orchestrator.persist().await;

        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(orchestrator.run(rx));

        OrchestratorHandle { tx, events }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(message) = self.internal_rx.recv() => self.handle_internal(message).await,
            }
        }
        debug!("调度器已退出");
    }

    // ========== 命令处理 ==========

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                prompts,
                delay_ms,
                auto_download,
                reply,
            } => {
                let result = self.start(prompts, delay_ms, auto_download).await;
                let _ = reply.send(result);
            }
            Command::Pause { reply } => {
                let result = self.pause().await;
                let _ = reply.send(result);
            }
            Command::Resume { reply } => {
                let result = self.resume().await;
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let result = self.stop().await;
                let _ = reply.send(result);
            }
            Command::GetState { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn start(
        &mut self,
        prompts: Vec<String>,
        delay_ms: u64,
        auto_download: bool,
    ) -> Result<(), QueueError> {
        self.state.check_startable()?;

        let target = self
            .link
            .active_target()
            .await
            .map_err(|e| QueueError::TargetUnavailable(e.to_string()))?;

        let state = QueueState::begin(prompts, delay_ms, auto_download, target)?;
        self.state = state;
        self.run_id += 1;
        self.needs_attach = true;
        self.commit().await;

        self.events.log(
            LogLevel::Info,
            format!(
                "🚀 开始处理 {} 个提示词 (间隔 {}ms, 自动下载: {})",
                self.state.prompts.len(),
                self.state.delay_ms,
                self.state.auto_download_enabled
            ),
        );
        // 第一步在回复 start 之前发出，之后到达的 pause 只会等它完成
        self.advance(self.run_id).await;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), QueueError> {
        self.state.pause()?;
        self.commit().await;
        self.events.log(LogLevel::Warning, "⏸️ 已暂停（当前提示词会继续完成）");
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), QueueError> {
        self.state.resume()?;
        self.commit().await;
        self.events.log(LogLevel::Info, "▶️ 继续运行");
        if self.in_flight.is_none() {
            self.advance(self.run_id).await;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), QueueError> {
        self.state.stop()?;
        self.needs_attach = false;
        self.commit().await;
        self.events.log(LogLevel::Warning, "⏹️ 已停止");
        Ok(())
    }

    // ========== 循环推进 ==========

    async fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Advance { run_id } => self.advance(run_id).await,
            Internal::StepFinished { run_id, outcome } => {
                self.in_flight = None;
                if run_id != self.run_id {
                    debug!("丢弃旧运行的步骤结果 (run {})", run_id);
                    // 新运行在等这个步骤结束
                    if self.state.phase == Phase::Running {
                        self.schedule_next();
                    }
                    return;
                }
                self.finish_step(outcome).await;
            }
        }
    }

    /// 通过信箱安排下一步，而不是直接递归调用
    fn schedule_next(&self) {
        let _ = self.internal_tx.send(Internal::Advance {
            run_id: self.run_id,
        });
    }

    async fn advance(&mut self, run_id: u64) {
        if run_id != self.run_id || self.state.phase != Phase::Running || self.in_flight.is_some() {
            return;
        }

        if self.state.is_exhausted() {
            self.state.finish();
            self.commit().await;
            self.events.log(LogLevel::Success, "🎉 全部提示词处理完成");
            return;
        }

        let Some(prompt) = self.state.begin_item() else {
            return;
        };
        let Some(target) = self.state.target_handle.clone() else {
            self.state.fail("没有绑定目标页面");
            self.commit().await;
            self.events.log(LogLevel::Error, "没有绑定目标页面");
            return;
        };
        self.commit().await;

        let position = self.state.cursor + 1;
        let total = self.state.prompts.len();
        self.events.log(
            LogLevel::Info,
            format!(
                "[提示词 {}/{}] 📤 {}",
                position,
                total,
                truncate_text(&prompt, 50)
            ),
        );

        let request = SubmitRequest {
            prompt,
            delay_ms: self.state.delay_ms,
            auto_download: self.state.auto_download_enabled,
        };
        let attach = std::mem::take(&mut self.needs_attach);
        let link = self.link.clone();
        let policy = self.policy;
        let tx = self.internal_tx.clone();

        self.in_flight = Some(run_id);
        tokio::spawn(async move {
            let outcome = run_step(link.as_ref(), &target, &request, attach, policy).await;
            let _ = tx.send(Internal::StepFinished { run_id, outcome });
        });
    }

    async fn finish_step(&mut self, outcome: StepOutcome) {
        // 停止后返回的结果直接丢弃
        if !self.state.phase.is_active() {
            debug!("运行已结束 ({})，忽略步骤结果", self.state.phase);
            return;
        }

        let position = self.state.cursor + 1;
        let total = self.state.prompts.len();

        match outcome {
            StepOutcome::Completed { warning } => {
                if let Some(warning) = warning {
                    self.events.log(
                        LogLevel::Warning,
                        format!("[提示词 {}/{}] {}", position, total, warning),
                    );
                }

                let finished = self.state.complete_item();
                self.commit().await;
                self.events.log(
                    LogLevel::Success,
                    format!("[提示词 {}/{}] 提交完成", position, total),
                );

                if finished {
                    self.events.log(LogLevel::Success, "🎉 全部提示词处理完成");
                } else if self.state.phase == Phase::Running {
                    self.schedule_next();
                }
            }
            StepOutcome::Failed(reason) => {
                self.state.fail(reason.clone());
                self.commit().await;
                self.events.log(
                    LogLevel::Error,
                    format!("[提示词 {}/{}] 处理失败，队列已停止: {}", position, total, reason),
                );
            }
        }
    }

    // ========== 持久化与广播 ==========

    fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// 持久化并广播当前状态
    async fn commit(&self) {
        self.persist().await;
        self.events.publish_state(self.snapshot());
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            self.events
                .log(LogLevel::Warning, format!("保存队列状态失败: {}", e));
        }
    }
}

/// 执行一个步骤：（首个步骤）安装 Automator，然后带重试地投递请求
async fn run_step(
    link: &dyn AutomatorLink,
    target: &TargetHandle,
    request: &SubmitRequest,
    attach: bool,
    policy: DispatchPolicy,
) -> StepOutcome {
    if attach {
        if let Err(e) = link.attach(target).await {
            return StepOutcome::Failed(e.to_string());
        }
    }

    match dispatch_with_retry(link, target, request, policy).await {
        Ok(reply) if reply.success => StepOutcome::Completed {
            warning: reply.warning,
        },
        Ok(reply) => StepOutcome::Failed(
            reply
                .error
                .unwrap_or_else(|| "页面返回失败，但没有给出原因".to_string()),
        ),
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}
