//! Automator（页面侧）
//!
//! ## 模块划分
//!
//! - `locator` - 元素定位路径（支持穿越 shadow root）
//! - `wait` - 有界轮询等待
//! - `driver` - 页面驱动接口（由基础设施层实现）
//! - `protocol` - 单个提示词的提交流程
//! - `host` - 绑定到页面的 Automator 任务及其信箱

pub mod driver;
pub mod host;
pub mod locator;
pub mod protocol;
pub mod wait;

pub use driver::PageDriver;
pub use host::{spawn_automator, AutomatorMailbox};
pub use locator::{Hop, Locator};
pub use protocol::SubmissionProtocol;
pub use wait::{poll_until, PollSpec};
