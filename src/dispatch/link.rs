use async_trait::async_trait;

use crate::dispatch::message::{SubmitReply, SubmitRequest, TargetHandle};
use crate::error::TransportError;

/// Orchestrator 与 Automator 之间的连接
///
/// 实现：
/// - `browser::ChromiumLink`: 连接真实浏览器页面
/// - 测试中的脚本化实现
#[async_trait]
pub trait AutomatorLink: Send + Sync {
    /// 当前活动的目标页面
    async fn active_target(&self) -> Result<TargetHandle, TransportError>;

    /// 在目标页面上（重新）安装 Automator；重复调用是安全的
    async fn attach(&self, target: &TargetHandle) -> Result<(), TransportError>;

    /// 发送 `submitPrompt` 请求并等待回复
    async fn submit(
        &self,
        target: &TargetHandle,
        request: &SubmitRequest,
    ) -> Result<SubmitReply, TransportError>;
}
