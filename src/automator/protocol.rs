//! 提示词提交流程 - Automator 核心
//!
//! 把"提交这个提示词"翻译成页面上的具体步骤：
//! 定位输入框 → 定位提交按钮 → 等待按钮可用 → 清空 → 写入 → 再次等待按钮可用
//! → 点击提交 → 等待生成 → （可选）点击下载。
//!
//! 所有失败都在这里转换成 `SubmitReply`，不会以错误的形式越过本模块。

use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::automator::driver::PageDriver;
use crate::automator::locator::Locator;
use crate::automator::wait::{poll_until, PollSpec};
use crate::dispatch::message::{SubmitReply, SubmitRequest};
use crate::error::{AutomationError, BrowserError};
use crate::models::PageProfile;
use crate::utils::truncate_text;

/// 提交流程
pub struct SubmissionProtocol<D> {
    driver: D,
    profile: PageProfile,
}

impl<D: PageDriver> SubmissionProtocol<D> {
    pub fn new(driver: D, profile: PageProfile) -> Self {
        Self { driver, profile }
    }

    /// 执行一次完整的提交，返回结构化结果
    pub async fn submit(&self, request: &SubmitRequest) -> SubmitReply {
        info!("📝 开始提交: {}", truncate_text(&request.prompt, 50));

        if let Err(e) = self.submit_prompt(request).await {
            warn!("⚠️ 提交失败: {}", e);
            return SubmitReply::failed(e.to_string());
        }

        // 等待生成完成
        sleep(Duration::from_millis(request.delay_ms)).await;

        if !request.auto_download {
            return SubmitReply::ok();
        }

        match self.download().await {
            Ok(()) => {
                info!("✓ 已触发下载");
                SubmitReply::ok()
            }
            Err(e) => {
                warn!("⚠️ 下载失败（不影响队列）: {}", e);
                SubmitReply::ok().with_warning(format!("下载失败: {}", e))
            }
        }
    }

    async fn submit_prompt(&self, request: &SubmitRequest) -> Result<(), AutomationError> {
        let timing = &self.profile.timing;
        let input = &self.profile.input;
        let submit = &self.profile.submit;

        self.locate(input, "输入框", timing.locate()).await?;
        self.locate(submit, "提交按钮", timing.locate()).await?;
        self.wait_actionable(submit, "提交按钮").await?;

        self.driver
            .clear_content(input)
            .await
            .map_err(|e| driver_error("清空输入框", e))?;
        self.driver
            .inject_content(input, &request.prompt)
            .await
            .map_err(|e| driver_error("写入输入框", e))?;

        // 写入内容后按钮可能短暂禁用
        self.wait_actionable(submit, "提交按钮").await?;

        self.driver
            .trigger(submit)
            .await
            .map_err(|e| driver_error("点击提交按钮", e))?;
        debug!("已点击提交按钮");
        Ok(())
    }

    async fn download(&self) -> Result<(), AutomationError> {
        let download = self.profile.download.as_ref().ok_or_else(|| AutomationError::Driver {
            what: "下载按钮".to_string(),
            reason: "页面配置中没有下载按钮".to_string(),
        })?;

        self.locate(download, "下载按钮", self.profile.timing.download())
            .await?;
        self.driver
            .trigger(download)
            .await
            .map_err(|e| driver_error("点击下载按钮", e))
    }

    /// 在限定时间内轮询，直到元素出现
    async fn locate(
        &self,
        locator: &Locator,
        what: &str,
        spec: PollSpec,
    ) -> Result<(), AutomationError> {
        debug!("查找 {}: {}", what, locator);
        let found = poll_until(spec, move || async move {
            self.driver
                .probe(locator)
                .await
                .map(|present| present.then_some(()))
        })
        .await;

        found.ok_or_else(|| AutomationError::NotFound {
            what: format!("{} ({})", what, locator),
            waited_ms: spec.max_wait.as_millis() as u64,
        })
    }

    /// 等待控件变为可操作
    ///
    /// 已可操作时立即返回；否则监听启用/禁用信号，第一次变为可操作时返回。
    async fn wait_actionable(&self, locator: &Locator, what: &str) -> Result<(), AutomationError> {
        if self
            .driver
            .is_actionable(locator)
            .await
            .map_err(|e| driver_error(what, e))?
        {
            return Ok(());
        }

        debug!("{} 当前不可用，等待状态变化...", what);
        let max_wait = self.profile.timing.actionable();
        let watch = async {
            loop {
                if self.driver.actionable_signal(locator).await? {
                    return Ok::<(), BrowserError>(());
                }
            }
        };

        match timeout(max_wait, watch).await {
            Ok(result) => result.map_err(|e| driver_error(what, e)),
            Err(_) => Err(AutomationError::Timeout {
                what: what.to_string(),
                waited_ms: max_wait.as_millis() as u64,
            }),
        }
    }
}

fn driver_error(what: &str, err: BrowserError) -> AutomationError {
    AutomationError::Driver {
        what: what.to_string(),
        reason: err.to_string(),
    }
}
