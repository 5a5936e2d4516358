use thiserror::Error;

use crate::orchestrator::state::Phase;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 调度通道错误（无法联系到 Automator）
    #[error("传输错误: {0}")]
    Transport(#[from] TransportError),
    /// 页面自动化错误（Automator 报告的逻辑失败）
    #[error("自动化错误: {0}")]
    Automation(#[from] AutomationError),
    /// 队列命令错误
    #[error("队列错误: {0}")]
    Queue(#[from] QueueError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 操作时元素已不在页面上
    #[error("元素不存在: {locator}")]
    ElementMissing { locator: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本返回值无法解析
    #[error("脚本返回值无法解析: {source}")]
    ScriptResultInvalid {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 调度通道错误
///
/// 只有 `Unreachable` 表示请求根本没有送达，可以安全重试；
/// 其余情况请求已经送达，重试可能导致重复提交。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// 目标页面上没有已安装的 Automator，或信箱已关闭
    #[error("无法联系到页面 {target} 上的 Automator")]
    Unreachable { target: String },
    /// Automator 在回复之前退出
    #[error("Automator 在回复之前断开 ({target})")]
    Disconnected { target: String },
    /// 等待回复超时
    #[error("等待 Automator 回复超时 ({target}, {millis}ms)")]
    Timeout { target: String, millis: u64 },
    /// 无法确定或安装目标页面
    #[error("无法绑定目标页面: {reason}")]
    AttachFailed { reason: String },
}

impl TransportError {
    /// 是否可以重试（请求未送达）
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }
}

/// 页面自动化错误（单个提示词提交流程中的逻辑失败）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationError {
    /// 在限定时间内没有找到元素
    #[error("NotFound: {what} 在 {waited_ms}ms 内未出现")]
    NotFound { what: String, waited_ms: u64 },
    /// 控件在限定时间内没有变为可操作
    #[error("Timeout: {what} 在 {waited_ms}ms 内未变为可用")]
    Timeout { what: String, waited_ms: u64 },
    /// 页面驱动报告的错误
    #[error("页面操作失败 ({what}): {reason}")]
    Driver { what: String, reason: String },
}

/// 队列命令错误（同步拒绝，不改变状态）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// 提示词列表为空
    #[error("提示词列表为空")]
    EmptyPrompts,
    /// 当前阶段不允许该命令
    #[error("当前状态为 {phase}，无法执行 {command}")]
    WrongPhase { command: &'static str, phase: Phase },
    /// 无法确定目标页面
    #[error("无法确定目标页面: {0}")]
    TargetUnavailable(String),
    /// 调度器已退出
    #[error("调度器已退出")]
    OrchestratorGone,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 状态记录解析失败
    #[error("状态记录解析失败 ({path}): {source}")]
    StateParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 页面配置文件解析失败
    #[error("页面配置解析失败 ({path}): {reason}")]
    ProfileParseFailed { path: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::ScriptResultInvalid {
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }
}

impl FileError {
    pub fn write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
