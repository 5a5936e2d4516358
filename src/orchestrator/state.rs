//! 队列状态
//!
//! `QueueState` 是运行状态的唯一数据源，只由调度器自己的处理函数修改。
//! 这里只放纯粹的状态转换，不涉及 I/O。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dispatch::message::TargetHandle;
use crate::error::QueueError;
use crate::utils::truncate_text;

/// 提交间隔下限（毫秒）
pub const MIN_DELAY_MS: u64 = 500;
/// 提交间隔上限（毫秒）
pub const MAX_DELAY_MS: u64 = 10_000;
/// 当前提示词预览的最大字符数
pub const PREVIEW_CHARS: usize = 50;

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Paused => "paused",
            Phase::Finished => "finished",
            Phase::Error => "error",
        }
    }

    /// 运行是否仍在进行中（可能还有步骤在执行）
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Running | Phase::Paused)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 队列状态（持久化记录）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub phase: Phase,
    pub prompts: Vec<String>,
    pub cursor: usize,
    pub active_prompt_preview: String,
    pub delay_ms: u64,
    pub auto_download_enabled: bool,
    pub target_handle: Option<TargetHandle>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// 对外发布的状态快照（`getState` / `stateUpdate`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub phase: Phase,
    pub cursor: usize,
    pub total: usize,
    pub active_prompt_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// 整理提示词列表：去掉首尾空白，丢弃空项
pub fn normalize_prompts<I, S>(prompts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    prompts
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// 把提交间隔限制在允许范围内
pub fn clamp_delay(delay_ms: u64) -> u64 {
    delay_ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS)
}

impl QueueState {
    /// 为新的一次运行创建状态（替换之前的状态）
    pub fn begin(
        prompts: Vec<String>,
        delay_ms: u64,
        auto_download: bool,
        target: TargetHandle,
    ) -> Result<Self, QueueError> {
        let prompts = normalize_prompts(prompts);
        if prompts.is_empty() {
            return Err(QueueError::EmptyPrompts);
        }
        Ok(Self {
            phase: Phase::Running,
            prompts,
            cursor: 0,
            active_prompt_preview: String::new(),
            delay_ms: clamp_delay(delay_ms),
            auto_download_enabled: auto_download,
            target_handle: Some(target),
            last_error: None,
        })
    }

    /// 当前阶段是否允许开始新的运行
    pub fn check_startable(&self) -> Result<(), QueueError> {
        if self.phase.is_active() {
            return Err(QueueError::WrongPhase {
                command: "start",
                phase: self.phase,
            });
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), QueueError> {
        self.transition("pause", Phase::Running, Phase::Paused)
    }

    pub fn resume(&mut self) -> Result<(), QueueError> {
        self.transition("resume", Phase::Paused, Phase::Running)
    }

    /// 停止运行并清空队列
    pub fn stop(&mut self) -> Result<(), QueueError> {
        if !self.phase.is_active() {
            return Err(QueueError::WrongPhase {
                command: "stop",
                phase: self.phase,
            });
        }
        *self = Self::default();
        Ok(())
    }

    /// 下一个待处理的提示词
    pub fn current_prompt(&self) -> Option<&str> {
        self.prompts.get(self.cursor).map(String::as_str)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.prompts.len()
    }

    /// 标记当前提示词开始处理，返回完整提示词
    pub fn begin_item(&mut self) -> Option<String> {
        let prompt = self.current_prompt()?.to_string();
        self.active_prompt_preview = truncate_text(&prompt, PREVIEW_CHARS);
        Some(prompt)
    }

    /// 当前提示词处理完成：游标前进；运行中且全部完成时进入 `finished`
    ///
    /// 返回是否已全部完成。
    pub fn complete_item(&mut self) -> bool {
        if !self.is_exhausted() {
            self.cursor += 1;
        }
        self.active_prompt_preview.clear();
        if self.phase == Phase::Running && self.is_exhausted() {
            self.phase = Phase::Finished;
            return true;
        }
        false
    }

    /// 运行全部完成
    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.active_prompt_preview.clear();
    }

    /// 当前提示词失败：进入 `error`，游标保持不变
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.phase = Phase::Error;
        self.last_error = Some(reason.into());
    }

    /// 进程重启后恢复：正在进行的运行无法继续，降级为 `idle`
    ///
    /// 记录被外部改动过时，游标收回到 `0..=len`。
    pub fn restored(mut self) -> Self {
        self.cursor = self.cursor.min(self.prompts.len());
        if self.phase.is_active() {
            self.phase = Phase::Idle;
            self.active_prompt_preview.clear();
        }
        self
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            cursor: self.cursor,
            total: self.prompts.len(),
            active_prompt_preview: self.active_prompt_preview.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn transition(
        &mut self,
        command: &'static str,
        from: Phase,
        to: Phase,
    ) -> Result<(), QueueError> {
        if self.phase != from {
            return Err(QueueError::WrongPhase {
                command,
                phase: self.phase,
            });
        }
        self.phase = to;
        Ok(())
    }
}
