//! 目标页面 → Automator 信箱 的注册表

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::automator::AutomatorMailbox;
use crate::dispatch::message::{SubmitReply, SubmitRequest, TargetHandle};
use crate::error::TransportError;

#[derive(Default)]
pub struct AutomatorRegistry {
    slots: Mutex<HashMap<TargetHandle, AutomatorMailbox>>,
}

impl AutomatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 安装信箱，替换同一页面上已有的 Automator
    ///
    /// 被替换的 Automator 立即中止，同一页面上始终只有一个提交流程。
    pub fn install(&self, mailbox: AutomatorMailbox) {
        let target = mailbox.target().clone();
        let replaced = self.lock().insert(target.clone(), mailbox);
        if let Some(old) = replaced {
            old.shutdown();
            debug!("已替换页面 {} 上的 Automator", target);
        }
    }

    /// 把请求投递给页面上的 Automator
    pub async fn submit(
        &self,
        target: &TargetHandle,
        request: SubmitRequest,
        reply_timeout: Duration,
    ) -> Result<SubmitReply, TransportError> {
        // 先克隆信箱再 await，不在持锁期间挂起
        let mailbox = self.lock().get(target).cloned();
        match mailbox {
            Some(mailbox) => mailbox.submit(request, reply_timeout).await,
            None => Err(TransportError::Unreachable {
                target: target.to_string(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TargetHandle, AutomatorMailbox>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
