use crate::browser::{self, ChromiumLink};
use crate::config::Config;
use crate::dispatch::DispatchPolicy;
use crate::models::{load_page_profile, load_prompts_file};
use crate::orchestrator::{
    CommandResponse, JsonFileStore, Orchestrator, OrchestratorHandle, Phase, UiEvent,
};
use crate::ui::{render_status, ConsoleRenderer};
use crate::utils::logging;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    handle: OrchestratorHandle,
}

/// 控制台命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Pause,
    Resume,
    Stop,
    State,
    Logs,
    Quit,
}

impl ConsoleCommand {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" => Some(Self::Stop),
            "state" | "status" => Some(Self::State),
            "logs" => Some(Self::Logs),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(&config.target_url, config.delay_ms, config.auto_download);

        // 连接浏览器
        let browser = if config.headless {
            browser::launch_headless_browser(config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser(config.browser_debug_port).await?
        };

        let profile = load_page_profile(config.page_profile.as_deref()).await?;
        let link = ChromiumLink::new(
            browser,
            profile,
            config.target_url.clone(),
            config.target_title.clone(),
            config.dispatch_timeout(),
        );
        let store = JsonFileStore::new(&config.state_file);

        let handle = Orchestrator::spawn(
            Arc::new(store),
            Arc::new(link),
            DispatchPolicy::default(),
        )
        .await;

        Ok(Self { config, handle })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let prompts = load_prompts_file(Path::new(&self.config.prompts_file)).await?;
        if prompts.is_empty() {
            warn!("⚠️ 提示词文件为空，程序结束");
            return Ok(());
        }

        let mut renderer = ConsoleRenderer::new(Some(self.config.output_log_file.clone()));
        let mut events = self.handle.subscribe();

        self.handle
            .start(prompts, self.config.delay_ms, self.config.auto_download)
            .await?;
        info!("💡 输入 pause / resume / stop / state / logs / quit 控制队列");

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                line = stdin.next_line(), if stdin_open => match line? {
                    Some(input) => {
                        if !self.handle_input(&input, &renderer).await {
                            break;
                        }
                    }
                    None => stdin_open = false,
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        let settled = matches!(
                            &event,
                            UiEvent::StateUpdate(s)
                                if matches!(s.phase, Phase::Finished | Phase::Error | Phase::Idle)
                        );
                        renderer.handle(event);
                        if settled {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("界面落后，丢弃了 {} 条事件", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        let snapshot = self.handle.get_state().await?;
        logging::print_final_stats(
            snapshot.cursor,
            snapshot.total,
            snapshot.phase.as_str(),
            &self.config.output_log_file,
        );

        Ok(())
    }

    /// 处理一行控制台输入，返回 false 表示退出
    async fn handle_input(&self, input: &str, renderer: &ConsoleRenderer) -> bool {
        if input.trim().is_empty() {
            return true;
        }
        let Some(command) = ConsoleCommand::parse(input) else {
            warn!("未知命令: {}", input.trim());
            return true;
        };

        let result = match command {
            ConsoleCommand::Pause => self.handle.pause().await,
            ConsoleCommand::Resume => self.handle.resume().await,
            ConsoleCommand::Stop => self.handle.stop().await,
            ConsoleCommand::State => self.handle.get_state().await.map(|snapshot| {
                println!("{}", render_status(&snapshot));
            }),
            ConsoleCommand::Logs => {
                renderer.print_history();
                Ok(())
            }
            ConsoleCommand::Quit => return false,
        };

        let response = CommandResponse::from(result);
        match response.error {
            Some(error) if !response.success => warn!("❌ {:?}: {}", command, error),
            _ => debug!("命令已执行: {:?}", command),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_commands() {
        assert_eq!(ConsoleCommand::parse(" Pause "), Some(ConsoleCommand::Pause));
        assert_eq!(ConsoleCommand::parse("r"), Some(ConsoleCommand::Resume));
        assert_eq!(ConsoleCommand::parse("stop"), Some(ConsoleCommand::Stop));
        assert_eq!(ConsoleCommand::parse("exit"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("launch"), None);
    }
}
