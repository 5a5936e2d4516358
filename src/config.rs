use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标URL（找不到目标页面时会打开它）
    pub target_url: String,
    /// 目标页面标题关键字（用于在已打开的标签页中查找）
    pub target_title: Option<String>,
    /// 是否启动无头浏览器，而不是连接到已运行的浏览器
    pub headless: bool,
    /// 无头模式下使用的浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 提示词文件（每行一个）
    pub prompts_file: String,
    /// 每个提示词提交后的等待时间（毫秒）
    pub delay_ms: u64,
    /// 是否在生成完成后自动点击下载
    pub auto_download: bool,
    /// 队列状态持久化文件
    pub state_file: String,
    /// 页面配置文件（TOML，可选）
    pub page_profile: Option<String>,
    /// 等待 Automator 回复的超时时间（秒）
    pub dispatch_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://example.com/generate".to_string(),
            target_title: None,
            headless: false,
            chrome_executable: None,
            prompts_file: "prompts.txt".to_string(),
            delay_ms: 3000,
            auto_download: false,
            state_file: "queue_state.json".to_string(),
            page_profile: None,
            dispatch_timeout_secs: 180,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            target_title: std::env::var("TARGET_TITLE").ok().filter(|v| !v.trim().is_empty()),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|v| !v.trim().is_empty()),
            prompts_file: std::env::var("PROMPTS_FILE").unwrap_or(default.prompts_file),
            delay_ms: std::env::var("DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.delay_ms),
            auto_download: std::env::var("AUTO_DOWNLOAD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.auto_download),
            state_file: std::env::var("STATE_FILE").unwrap_or(default.state_file),
            page_profile: std::env::var("PAGE_PROFILE").ok().filter(|v| !v.trim().is_empty()),
            dispatch_timeout_secs: std::env::var("DISPATCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.dispatch_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}
