//! 事件通道（Orchestrator → UI）
//!
//! 单向广播，尽力而为：没有订阅者或订阅者落后时事件直接丢弃。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::orchestrator::state::StateSnapshot;

const EVENT_CAPACITY: usize = 256;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 日志事件（不持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

/// UI 事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    StateUpdate(StateSnapshot),
    Log(LogEvent),
}

/// 事件总线
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn publish_state(&self, snapshot: StateSnapshot) {
        let _ = self.tx.send(UiEvent::StateUpdate(snapshot));
    }

    /// 发布日志事件，同时写入 tracing
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Success => info!("✓ {}", message),
            LogLevel::Warning => warn!("⚠️ {}", message),
            LogLevel::Error => error!("❌ {}", message),
        }
        let _ = self.tx.send(UiEvent::Log(LogEvent {
            level,
            message,
            timestamp: Local::now(),
        }));
    }
}
