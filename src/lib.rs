//! # Prompt Queue Submit
//!
//! 把一组提示词依次提交到网页生成工具的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ChromiumDriver` - 页面驱动：定位、清空、注入、点击
//!
//! ### ② 页面自动化层（Automator）
//! - `automator/` - 只处理单个提示词
//! - `SubmissionProtocol` - 定位 → 等待可操作 → 清空 → 注入 → 点击 → 等待 → 下载
//! - `AutomatorMailbox` - 每个页面一个任务，逐个处理请求
//!
//! ### ③ 投递层（Dispatch）
//! - `dispatch/` - `submitPrompt` 请求 / 回复
//! - `dispatch_with_retry` - 页面不可达时重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 队列状态机、持久化、事件广播
//!
//! ### ⑤ 显示层（UI）
//! - `ui/` - 订阅事件，渲染进度和最近日志
//!
//! ## 模块结构

pub mod app;
pub mod automator;
pub mod browser;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod ui;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use browser::{connect_to_browser, ChromiumLink};
pub use config::Config;
pub use error::{AppError, AutomationError, QueueError, TransportError};
pub use infrastructure::JsExecutor;
pub use models::PageProfile;
pub use orchestrator::{Orchestrator, OrchestratorHandle, Phase, StateSnapshot};
