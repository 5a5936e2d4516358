//! 显示层：只订阅事件，不驱动队列

pub mod console;

pub use console::{render_status, ConsoleRenderer, LogHistory, LOG_HISTORY_LIMIT};
