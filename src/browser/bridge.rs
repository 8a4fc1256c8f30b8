use serde_json::Value;

use super::host::{PageHost, TabInfo};
use super::operation::PageOperation;
use crate::error::{CartToolsError, Result};

/// Runs page operations inside the active tab and hands back whatever the
/// page resolved to. It does not look at the value itself.
#[derive(Debug, Clone)]
pub struct ContextBridge<H> {
    host: H,
}

impl<H: PageHost> ContextBridge<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Resolve the tab the user is looking at.
    pub async fn active_tab(&self) -> Result<TabInfo> {
        self.host
            .active_tab()
            .await?
            .ok_or(CartToolsError::NoActiveTab)
    }

    pub async fn run_in_page(&self, operation: &PageOperation) -> Result<Value> {
        let tab = self.active_tab().await?;
        self.run_in_tab(&tab, operation).await
    }

    pub async fn run_in_tab(&self, tab: &TabInfo, operation: &PageOperation) -> Result<Value> {
        if tab.is_restricted() {
            return Err(CartToolsError::RestrictedPage(tab.url.clone()));
        }

        tracing::debug!("Running {:?} in tab {} ({})", operation, tab.id, tab.url);
        let injection = self.host.inject(tab, operation).await?;

        match injection.value {
            Some(Value::Null) | None => Err(injection
                .error
                .map(CartToolsError::JavaScriptError)
                .unwrap_or(CartToolsError::NoResult)),
            Some(value) => Ok(value),
        }
    }

    pub async fn reload_active_tab(&self) -> Result<()> {
        let tab = self.active_tab().await?;
        self.host.reload(&tab).await
    }
}
