//! 基础设施层
//!
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ChromiumDriver` - 基于 JsExecutor 的页面驱动

pub mod chromium_driver;
pub mod js_executor;

pub use chromium_driver::ChromiumDriver;
pub use js_executor::JsExecutor;
