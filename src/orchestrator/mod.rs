//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层持有队列状态机，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `state` - 队列状态
//! - 阶段：idle / running / paused / finished / error
//! - 纯粹的状态转换，不做 I/O
//!
//! ### `store` - 持久化
//! - 每次修改后覆盖保存整条记录
//! - 启动时读取一次，进行中的运行降级为 idle
//!
//! ### `events` - 事件广播
//! - `stateUpdate` / `log`，尽力而为
//!
//! ### `command` - 命令通道
//! - start / pause / resume / stop / getState
//!
//! ### `runner` - 调度器任务
//! - 顺序处理命令与步骤结果
//! - 通过 `dispatch` 把提示词投递给 Automator
//!
//! ## 层次关系
//!
//! ```text
//! UI (ui::console)
//!     ↓ 命令        ↑ 事件
//! orchestrator::runner (QueueState)
//!     ↓ submitPrompt（带重试）
//! dispatch::AutomatorLink
//!     ↓
//! automator::SubmissionProtocol (单个提示词)
//!     ↓
//! infrastructure (页面驱动)
//! ```

pub mod command;
pub mod events;
pub mod runner;
pub mod state;
pub mod store;

pub use command::{CommandResponse, OrchestratorHandle};
pub use events::{EventBus, LogEvent, LogLevel, UiEvent};
pub use runner::Orchestrator;
pub use state::{Phase, QueueState, StateSnapshot};
pub use store::{JsonFileStore, MemoryStore, StateStore};
