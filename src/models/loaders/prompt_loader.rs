use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::orchestrator::state::normalize_prompts;

/// 把文本拆分为提示词列表
///
/// 每行一个提示词；去掉首尾空白，丢弃空行；没有转义或引号语法。
pub fn parse_prompts(text: &str) -> Vec<String> {
    normalize_prompts(text.lines())
}

/// 从文件加载提示词列表
pub async fn load_prompts_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取提示词文件: {}", path.display()))?;

    let prompts = parse_prompts(&content);
    tracing::info!(
        "成功加载 {} 个提示词: {}",
        prompts.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(prompts)
}
