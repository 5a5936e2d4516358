//! 页面驱动接口
//!
//! Automator 对页面的全部要求：探测元素、读取/监听可操作状态、清空与写入内容、触发点击。
//! 具体实现见 `infrastructure::ChromiumDriver`。

use async_trait::async_trait;

use crate::automator::locator::Locator;
use crate::error::BrowserError;

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 元素当前是否存在
    async fn probe(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// 控件当前是否可操作（未禁用）
    async fn is_actionable(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// 等待控件的启用/禁用信号发生下一次变化，返回变化后的可操作状态。
    ///
    /// 可能一直不返回，调用方负责加超时。
    async fn actionable_signal(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// 清空输入区域中的旧内容
    async fn clear_content(&self, locator: &Locator) -> Result<(), BrowserError>;

    /// 写入新内容并通知页面
    async fn inject_content(&self, locator: &Locator, text: &str) -> Result<(), BrowserError>;

    /// 触发控件（点击）
    async fn trigger(&self, locator: &Locator) -> Result<(), BrowserError>;
}
