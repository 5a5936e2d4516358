//! 元素定位描述
//!
//! 一个 `Locator` 是若干"跳"组成的路径。每一跳可以先进入一个宿主元素的
//! shadow root，再在其中查找子元素；下一跳从上一跳找到的元素开始继续查找。
//! 这样嵌套的 shadow DOM 查找只需要一段通用的遍历逻辑。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 定位路径中的一跳
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// 宿主元素选择器；设置后在其 shadow root 内继续查找
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// 子元素选择器
    pub selector: String,
}

/// 元素定位描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub hops: Vec<Hop>,
}

impl Locator {
    /// 普通 CSS 选择器（不穿越 shadow root）
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            hops: vec![Hop {
                host: None,
                selector: selector.into(),
            }],
        }
    }

    /// 先进入 `host` 的 shadow root，再查找 `selector`
    pub fn shadow(host: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            hops: vec![Hop {
                host: Some(host.into()),
                selector: selector.into(),
            }],
        }
    }

    /// 在当前路径找到的元素之下追加一跳
    pub fn then(mut self, host: Option<&str>, selector: impl Into<String>) -> Self {
        self.hops.push(Hop {
            host: host.map(str::to_string),
            selector: selector.into(),
        });
        self
    }

    /// 生成一段 JS 表达式，求值结果为匹配的元素或 `null`
    pub fn resolve_expr(&self) -> String {
        let hops = serde_json::to_string(&self.hops).unwrap_or_else(|_| "[]".to_string());
        format!("({})({})", RESOLVE_FN, hops)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .hops
            .iter()
            .map(|hop| match &hop.host {
                Some(host) => format!("{}::shadow {}", host, hop.selector),
                None => hop.selector.clone(),
            })
            .collect();
        write!(f, "{}", parts.join(" >> "))
    }
}

const RESOLVE_FN: &str = r#"(hops) => {
    let scope = document;
    let node = null;
    for (const hop of hops) {
        if (hop.host) {
            const host = scope.querySelector(hop.host);
            if (!host || !host.shadowRoot) return null;
            scope = host.shadowRoot;
        }
        node = scope.querySelector(hop.selector);
        if (!node) return null;
        scope = node;
    }
    return node;
}"#;
