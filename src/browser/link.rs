//! 基于 Chromium 的 Orchestrator ↔ Automator 连接

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::Browser;
use std::time::Duration;
use tracing::info;

use crate::automator::{spawn_automator, SubmissionProtocol};
use crate::browser::connection::find_target_page;
use crate::dispatch::{AutomatorLink, AutomatorRegistry, SubmitReply, SubmitRequest, TargetHandle};
use crate::error::TransportError;
use crate::infrastructure::{ChromiumDriver, JsExecutor};
use crate::models::PageProfile;

pub struct ChromiumLink {
    browser: Browser,
    registry: AutomatorRegistry,
    profile: PageProfile,
    target_url: String,
    target_title: Option<String>,
    reply_timeout: Duration,
}

impl ChromiumLink {
    pub fn new(
        browser: Browser,
        profile: PageProfile,
        target_url: impl Into<String>,
        target_title: Option<String>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            browser,
            registry: AutomatorRegistry::new(),
            profile,
            target_url: target_url.into(),
            target_title,
            reply_timeout,
        }
    }
}

fn attach_failed(err: impl std::fmt::Display) -> TransportError {
    TransportError::AttachFailed {
        reason: err.to_string(),
    }
}

#[async_trait]
impl AutomatorLink for ChromiumLink {
    async fn active_target(&self) -> Result<TargetHandle, TransportError> {
        let page = find_target_page(
            &self.browser,
            Some(&self.target_url),
            self.target_title.as_deref(),
        )
        .await
        .map_err(attach_failed)?;
        Ok(TargetHandle::new(page.target_id().inner().clone()))
    }

    async fn attach(&self, target: &TargetHandle) -> Result<(), TransportError> {
        let page = self
            .browser
            .get_page(TargetId::new(target.as_str()))
            .await
            .map_err(attach_failed)?;

        let driver = ChromiumDriver::new(JsExecutor::new(page));
        let ready_state = driver.ping().await.map_err(attach_failed)?;
        info!("🔗 已在页面 {} 上安装 Automator (readyState: {})", target, ready_state);

        let protocol = SubmissionProtocol::new(driver, self.profile.clone());
        self.registry.install(spawn_automator(target.clone(), protocol));
        Ok(())
    }

    async fn submit(
        &self,
        target: &TargetHandle,
        request: &SubmitRequest,
    ) -> Result<SubmitReply, TransportError> {
        self.registry
            .submit(target, request.clone(), self.reply_timeout)
            .await
    }
}
