use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::host::{Injection, PageHost, TabInfo};
use super::operation::PageOperation;
use crate::error::{CartToolsError, Result};

/// Default DevTools endpoint of a browser started with
/// `--remote-debugging-port=9222`.
pub const DEFAULT_CDP_ENDPOINT: &str = "http://127.0.0.1:9222";

/// Turn `9222`, `127.0.0.1:9222`, `http://host:port/` or a
/// `ws://host:port/devtools/browser/<id>` URL into an HTTP base URL.
pub fn normalize_endpoint(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(port) = raw.parse::<u16>() {
        return format!("http://127.0.0.1:{}", port);
    }

    let (scheme, rest) = match raw.split_once("://") {
        Some(("ws", rest)) => ("http", rest),
        Some(("wss", rest)) => ("https", rest),
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", raw),
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    format!("{}://{}", scheme, authority)
}

/// Talks to the user's browser over the Chrome DevTools Protocol.
///
/// Tabs are discovered through `/json/list`; each call opens a short-lived
/// WebSocket to the tab's debugger URL.
#[derive(Debug, Clone)]
pub struct CdpHost {
    endpoint: String,
    client: reqwest::Client,
}

impl CdpHost {
    pub fn new(endpoint: &str) -> Result<Self> {
        // Bypass proxies: the endpoint is almost always loopback.
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                CartToolsError::CdpConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            endpoint: normalize_endpoint(endpoint),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Page targets, most recently focused first.
    pub async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let url = format!("{}/json/list", self.endpoint);
        let response = self.client.get(&url).send().await.map_err(|e| {
            CartToolsError::CdpConnectionFailed(format!("{}: {}", self.endpoint, e))
        })?;

        let tabs: Vec<TabInfo> = response.json().await.map_err(|e| {
            CartToolsError::CdpConnectionFailed(format!("Failed to parse tab list: {}", e))
        })?;

        // Skip service workers, extension backgrounds and iframes
        Ok(tabs.into_iter().filter(|t| t.page_type == "page").collect())
    }

    /// Send one CDP command to a tab and return the raw response message.
    async fn send_to_tab(&self, tab: &TabInfo, method: &str, params: Value) -> Result<Value> {
        let ws_url = tab.web_socket_debugger_url.as_deref().ok_or_else(|| {
            CartToolsError::CdpConnectionFailed(format!(
                "Tab {} has no debugger URL (is DevTools open on it?)",
                tab.id
            ))
        })?;

        let (mut ws, _) = connect_async(ws_url).await.map_err(|e| {
            CartToolsError::CdpConnectionFailed(format!("WebSocket connection failed: {}", e))
        })?;

        let cmd = serde_json::json!({
            "id": 1,
            "method": method,
            "params": params,
        });

        ws.send(Message::Text(cmd.to_string().into()))
            .await
            .map_err(|e| CartToolsError::CdpConnectionFailed(format!("Failed to send {}: {}", method, e)))?;

        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let response: Value = serde_json::from_str(text.as_str())?;
                    if response.get("id") == Some(&serde_json::json!(1)) {
                        let _ = ws.close(None).await;
                        return Ok(response);
                    }
                    // Events emitted while we wait
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    return Err(CartToolsError::CdpConnectionFailed(format!(
                        "WebSocket error: {}",
                        e
                    )))
                }
            }
        }

        Err(CartToolsError::CdpConnectionFailed(format!(
            "No response to {} from tab {}",
            method, tab.id
        )))
    }
}

/// Map a `Runtime.evaluate` response onto an [`Injection`].
fn injection_from_response(tab: &TabInfo, response: &Value) -> Result<Injection> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("evaluation refused");
        tracing::debug!("Runtime.evaluate refused on {}: {}", tab.url, message);
        return Err(CartToolsError::RestrictedPage(tab.url.clone()));
    }

    let result = response.get("result").cloned().unwrap_or(Value::Null);

    if let Some(exception) = result.get("exceptionDetails") {
        let message = exception
            .get("exception")
            .and_then(|e| e.get("description"))
            .or_else(|| exception.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or("JavaScript exception");
        return Ok(Injection::error(message));
    }

    Ok(match result.get("result").and_then(|r| r.get("value")) {
        Some(value) => Injection::value(value.clone()),
        None => Injection::default(),
    })
}

#[async_trait]
impl PageHost for CdpHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        Ok(self.list_tabs().await?.into_iter().next())
    }

    async fn inject(&self, tab: &TabInfo, operation: &PageOperation) -> Result<Injection> {
        let params = serde_json::json!({
            "expression": operation.to_expression()?,
            "awaitPromise": true,
            "returnByValue": true,
        });

        let response = self.send_to_tab(tab, "Runtime.evaluate", params).await?;
        injection_from_response(tab, &response)
    }

    async fn reload(&self, tab: &TabInfo) -> Result<()> {
        let response = self
            .send_to_tab(tab, "Page.reload", serde_json::json!({}))
            .await?;

        if let Some(error) = response.get("error") {
            return Err(CartToolsError::Other(format!("Reload failed: {}", error)));
        }
        Ok(())
    }
}
