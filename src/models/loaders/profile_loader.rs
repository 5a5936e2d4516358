use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::error::ConfigError;
use crate::models::PageProfile;

/// 加载页面配置
///
/// 未指定路径时使用内置的默认配置。
pub async fn load_page_profile(path: Option<&str>) -> Result<PageProfile> {
    let Some(path) = path else {
        tracing::info!("未指定页面配置，使用默认配置");
        return Ok(PageProfile::default());
    };

    let profile_path = Path::new(path);
    let content = fs::read_to_string(profile_path)
        .await
        .with_context(|| format!("无法读取页面配置: {}", profile_path.display()))?;

    let profile = parse_page_profile(&content, path)?;
    tracing::info!(
        "已加载页面配置: {} (输入框: {}, 提交按钮: {})",
        profile_path.display(),
        profile.input,
        profile.submit
    );
    Ok(profile)
}

/// 解析 TOML 格式的页面配置
pub fn parse_page_profile(content: &str, path: &str) -> Result<PageProfile, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ProfileParseFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automator::Locator;

    #[test]
    fn parses_profile_with_shadow_hops_and_partial_timing() {
        let profile = parse_page_profile(
            r#"
            [input]
            hops = [{ host = "gen-app", selector = "textarea#prompt" }]

            [submit]
            hops = [{ host = "gen-app", selector = "button.generate" }]

            [timing]
            locate_timeout_ms = 3000
            "#,
            "profile.toml",
        )
        .unwrap();

        assert_eq!(profile.input, Locator::shadow("gen-app", "textarea#prompt"));
        assert_eq!(profile.download, None);
        assert_eq!(profile.timing.locate_timeout_ms, 3000);
        assert_eq!(profile.timing.poll_interval_ms, 200);
    }

    #[test]
    fn missing_submit_is_a_config_error() {
        let err = parse_page_profile("[input]\nhops = [{ selector = \"textarea\" }]\n", "bad.toml")
            .unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[tokio::test]
    async fn no_path_falls_back_to_default() {
        let profile = load_page_profile(None).await.unwrap();
        assert_eq!(profile, PageProfile::default());
    }
}
