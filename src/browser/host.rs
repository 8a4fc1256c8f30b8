use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::operation::PageOperation;
use crate::error::Result;

/// URL schemes the browser never lets extensions or DevTools clients script.
const RESTRICTED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "brave",
    "about",
    "view-source",
    "moz-extension",
];

/// Extension galleries block script injection even though they are https.
const RESTRICTED_HOSTS: &[(&str, &str)] = &[
    ("chromewebstore.google.com", "/"),
    ("chrome.google.com", "/webstore"),
    ("microsoftedge.microsoft.com", "/addons"),
];

/// A browser tab as seen from the DevTools `/json/list` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub page_type: String,
    pub web_socket_debugger_url: Option<String>,
}

impl TabInfo {
    /// Browser-internal and extension-gallery pages refuse injected scripts.
    pub fn is_restricted(&self) -> bool {
        let Ok(parsed) = url::Url::parse(&self.url) else {
            return true;
        };

        if RESTRICTED_SCHEMES.contains(&parsed.scheme()) {
            return true;
        }

        let host = parsed.host_str().unwrap_or_default();
        RESTRICTED_HOSTS
            .iter()
            .any(|(h, prefix)| host == *h && parsed.path().starts_with(prefix))
    }

    /// Path component of the tab URL (`/` when it cannot be parsed).
    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }
}

/// Outcome of one script injection, mirroring what the browser reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Injection {
    /// Resolved value; `None` when the script produced `undefined`.
    pub value: Option<Value>,
    /// Structured error text the execution layer attached, if any.
    pub error: Option<String>,
}

impl Injection {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(message.into()),
        }
    }
}

/// Browser capabilities the bridge depends on.
///
/// `inject` must fail with `RestrictedPage` when the browser refuses the
/// injection itself; script-level failures come back inside `Injection`.
#[async_trait]
pub trait PageHost: Send + Sync {
    /// The tab the user is looking at, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>>;

    /// Run the handler for `operation` in the tab's top-level page context.
    async fn inject(&self, tab: &TabInfo, operation: &PageOperation) -> Result<Injection>;

    async fn reload(&self, tab: &TabInfo) -> Result<()>;
}

#[async_trait]
impl<H: PageHost + ?Sized> PageHost for Arc<H> {
    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        (**self).active_tab().await
    }

    async fn inject(&self, tab: &TabInfo, operation: &PageOperation) -> Result<Injection> {
        (**self).inject(tab, operation).await
    }

    async fn reload(&self, tab: &TabInfo) -> Result<()> {
        (**self).reload(tab).await
    }
}
