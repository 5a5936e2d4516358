//! Chromium 页面驱动 - 基础设施层
//!
//! 用 `JsExecutor` 在页面内执行脚本来实现 `PageDriver`。
//! 每次操作都重新解析定位路径，不跨调用持有节点引用（页面可能随时重新渲染）。

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::automator::{Locator, PageDriver};
use crate::error::BrowserError;
use crate::infrastructure::JsExecutor;

/// 兜底间隔：节点被整体替换时 MutationObserver 不会触发，到时重新解析一次
const SIGNAL_FALLBACK_MS: u64 = 1000;

pub struct ChromiumDriver {
    executor: JsExecutor,
}

#[derive(Debug, Deserialize)]
struct Signal {
    actionable: bool,
}

impl ChromiumDriver {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    /// 页面是否还能执行脚本
    pub async fn ping(&self) -> Result<String, BrowserError> {
        self.executor.eval_as("document.readyState").await
    }

    /// 在找到的节点上执行 `body`（`node` 为节点变量），节点不存在时返回 `ElementMissing`
    async fn with_node(&self, locator: &Locator, body: &str) -> Result<(), BrowserError> {
        let script = format!(
            r#"
            (() => {{
                const node = {};
                if (!node) return false;
                {}
                return true;
            }})()
            "#,
            locator.resolve_expr(),
            body
        );
        let found: bool = self.executor.eval_as(script).await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::ElementMissing {
                locator: locator.to_string(),
            })
        }
    }

    async fn set_content(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let body = format!(
            r#"
                const text = {};
                node.focus();
                if ('value' in node) {{
                    const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(node), 'value');
                    if (desc && desc.set) {{ desc.set.call(node, text); }} else {{ node.value = text; }}
                }} else {{
                    node.textContent = text;
                }}
                node.dispatchEvent(new Event('input', {{ bubbles: true }}));
                node.dispatchEvent(new Event('change', {{ bubbles: true }}));
            "#,
            serde_json::to_string(text)?
        );
        self.with_node(locator, &body).await
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn probe(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let script = format!("({}) !== null", locator.resolve_expr());
        self.executor.eval_as(script).await
    }

    async fn is_actionable(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let script = format!(
            r#"
            (() => {{
                const node = {};
                if (!node) return false;
                return !(node.disabled || node.getAttribute('aria-disabled') === 'true');
            }})()
            "#,
            locator.resolve_expr()
        );
        self.executor.eval_as(script).await
    }

    async fn actionable_signal(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let resolve = locator.resolve_expr();
        let script = format!(
            r#"
            new Promise((resolve) => {{
                const find = () => {expr};
                const ready = (n) => !!n && !(n.disabled || n.getAttribute('aria-disabled') === 'true');
                const node = find();
                let observer = null;
                const timer = setTimeout(() => {{
                    if (observer) observer.disconnect();
                    resolve({{ actionable: ready(find()) }});
                }}, {fallback});
                if (!node) return;
                observer = new MutationObserver(() => {{
                    observer.disconnect();
                    clearTimeout(timer);
                    resolve({{ actionable: ready(node) }});
                }});
                observer.observe(node, {{ attributes: true, attributeFilter: ['disabled', 'aria-disabled'] }});
            }})
            "#,
            expr = resolve,
            fallback = SIGNAL_FALLBACK_MS
        );
        let signal: Signal = self.executor.eval_as(script).await?;
        debug!("可用状态变化: {} -> {}", locator, signal.actionable);
        Ok(signal.actionable)
    }

    async fn clear_content(&self, locator: &Locator) -> Result<(), BrowserError> {
        self.set_content(locator, "").await
    }

    async fn inject_content(&self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        self.set_content(locator, text).await
    }

    async fn trigger(&self, locator: &Locator) -> Result<(), BrowserError> {
        self.with_node(locator, "node.click();").await
    }
}
