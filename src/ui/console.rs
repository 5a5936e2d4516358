//! 控制台渲染器
//!
//! 被动订阅调度器的事件：状态更新渲染成进度条，日志保留最近 100 条并追加到日志文件。
//! 不驱动队列，只负责显示。

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::orchestrator::{LogEvent, LogLevel, Phase, StateSnapshot, UiEvent};

/// 日志列表最多保留的条数
pub const LOG_HISTORY_LIMIT: usize = 100;

const BAR_WIDTH: usize = 20;

/// 最近的日志
#[derive(Debug, Default)]
pub struct LogHistory {
    entries: VecDeque<LogEvent>,
}

impl LogHistory {
    pub fn push(&mut self, event: LogEvent) {
        if self.entries.len() == LOG_HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.entries.iter()
    }
}

/// 控制台渲染器
pub struct ConsoleRenderer {
    history: LogHistory,
    log_file_path: Option<String>,
    last_state: Option<StateSnapshot>,
}

impl ConsoleRenderer {
    pub fn new(log_file_path: Option<String>) -> Self {
        Self {
            history: LogHistory::default(),
            log_file_path,
            last_state: None,
        }
    }

    pub fn history(&self) -> &LogHistory {
        &self.history
    }

    pub fn last_state(&self) -> Option<&StateSnapshot> {
        self.last_state.as_ref()
    }

    /// 处理一个事件
    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::StateUpdate(snapshot) => {
                if self.last_state.as_ref() != Some(&snapshot) {
                    println!("{}", render_status(&snapshot));
                }
                self.last_state = Some(snapshot);
            }
            UiEvent::Log(log) => {
                self.append_to_file(&log);
                self.history.push(log);
            }
        }
    }

    /// 打印最近的日志
    pub fn print_history(&self) {
        for log in self.history.iter() {
            println!("{}", format_log_line(log));
        }
    }

    fn append_to_file(&self, log: &LogEvent) {
        let Some(path) = &self.log_file_path else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", format_log_line(log)));
        if let Err(e) = result {
            debug!("写入日志文件失败 ({}): {}", path, e);
        }
    }
}

/// 渲染状态栏：`[████░░░░] 3/10 running | 当前提示词`
pub fn render_status(snapshot: &StateSnapshot) -> String {
    let filled = if snapshot.total == 0 {
        0
    } else {
        (snapshot.cursor * BAR_WIDTH / snapshot.total).min(BAR_WIDTH)
    };
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));

    let mut line = format!(
        "[{}] {}/{} {}",
        bar, snapshot.cursor, snapshot.total, snapshot.phase
    );
    match snapshot.phase {
        Phase::Error => {
            if let Some(err) = &snapshot.last_error {
                line.push_str(&format!(" | {}", err));
            }
        }
        _ if !snapshot.active_prompt_preview.is_empty() => {
            line.push_str(&format!(" | {}", snapshot.active_prompt_preview));
        }
        _ => {}
    }
    line
}

fn format_log_line(log: &LogEvent) -> String {
    let level = match log.level {
        LogLevel::Info => "INFO",
        LogLevel::Success => "OK",
        LogLevel::Warning => "WARN",
        LogLevel::Error => "ERROR",
    };
    format!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S"),
        level,
        log.message
    )
}
