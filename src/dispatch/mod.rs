//! 调度通道（Orchestrator → Automator）
//!
//! - `message` - `submitPrompt` 请求/回复
//! - `link` - 连接抽象
//! - `registry` - 页面 → Automator 信箱
//! - `retry` - 有界重试

pub mod link;
pub mod message;
pub mod registry;
pub mod retry;

pub use link::AutomatorLink;
pub use message::{SubmitReply, SubmitRequest, TargetHandle};
pub use registry::AutomatorRegistry;
pub use retry::{dispatch_with_retry, DispatchPolicy, DISPATCH_BACKOFF, DISPATCH_MAX_ATTEMPTS};
