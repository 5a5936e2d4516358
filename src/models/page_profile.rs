//! 目标页面配置
//!
//! 描述目标站点的表单结构（输入框、提交按钮、下载按钮）以及各等待步骤的时间限制。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::automator::locator::Locator;
use crate::automator::wait::PollSpec;

/// 目标页面配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageProfile {
    /// 提示词输入区域
    pub input: Locator,
    /// 提交按钮
    pub submit: Locator,
    /// 下载按钮（可选）
    #[serde(default)]
    pub download: Option<Locator>,
    /// 等待时间
    #[serde(default)]
    pub timing: Timing,
}

/// 各等待步骤的时间限制（毫秒）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub poll_interval_ms: u64,
    pub locate_timeout_ms: u64,
    pub actionable_timeout_ms: u64,
    pub download_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            locate_timeout_ms: 10_000,
            actionable_timeout_ms: 60_000,
            download_timeout_ms: 5_000,
        }
    }
}

impl Timing {
    pub fn locate(&self) -> PollSpec {
        PollSpec::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.locate_timeout_ms),
        )
    }

    pub fn download(&self) -> PollSpec {
        PollSpec::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.download_timeout_ms),
        )
    }

    pub fn actionable(&self) -> Duration {
        Duration::from_millis(self.actionable_timeout_ms)
    }
}

impl Default for PageProfile {
    fn default() -> Self {
        Self {
            input: Locator::css("textarea"),
            submit: Locator::css("button[type=\"submit\"]"),
            download: Some(Locator::css("button[aria-label*=\"Download\" i]")),
            timing: Timing::default(),
        }
    }
}
