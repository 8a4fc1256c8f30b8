//! Toolbar badge: the cart item count of the tab the user is looking at.
//!
//! Updates are driven by [`BadgeEvent`]s. Every failure is swallowed; the
//! badge is cosmetic and must never interrupt anything.

pub mod notify;
pub mod sink;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{badge_text, StorefrontClient};
use crate::browser::{PageHost, TabInfo};
use crate::error::CartToolsError;

pub use notify::{BadgeMessage, BadgeNotifier, LoopbackNotifier, DEFAULT_NOTIFY_PORT};
pub use sink::{BadgeLine, BadgeSink, StatusLineBadge};

pub const DEFAULT_BADGE_COLOR: &str = "#4CAF50";

/// Why the badge is being refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeEvent {
    /// Watcher start (covers browser start and first install).
    Startup,
    /// The user switched to another tab.
    TabActivated(String),
    /// The active tab finished loading a new URL.
    NavigationCompleted(String),
    /// Someone sent `{"action":"updateBadge"}`.
    UpdateRequested,
}

/// Compare two polls of the active tab.
pub fn detect_tab_change(previous: Option<&TabInfo>, current: Option<&TabInfo>) -> Option<BadgeEvent> {
    match (previous, current) {
        (_, None) => None,
        (None, Some(tab)) => Some(BadgeEvent::TabActivated(tab.id.clone())),
        (Some(before), Some(tab)) if before.id != tab.id => {
            Some(BadgeEvent::TabActivated(tab.id.clone()))
        }
        (Some(before), Some(tab)) if before.url != tab.url => {
            Some(BadgeEvent::NavigationCompleted(tab.id.clone()))
        }
        _ => None,
    }
}

pub struct BadgeSync<H, S> {
    client: StorefrontClient<H>,
    sink: S,
    color: String,
}

impl<H: PageHost, S: BadgeSink> BadgeSync<H, S> {
    pub fn new(client: StorefrontClient<H>, sink: S, color: impl Into<String>) -> Self {
        Self {
            client,
            sink,
            color: color.into(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Refresh the badge for `tab`: item count for a cart, blank otherwise.
    ///
    /// Returns `false` when the read failed in a way that can clear up on
    /// its own, such as a page that is still loading; the caller retries.
    pub async fn update(&self, tab: &TabInfo) -> bool {
        let (text, has_cart, settled) = match self.client.read_cart_in(tab).await {
            Ok(cart) => (badge_text(&cart), true, true),
            Err(e) => {
                tracing::debug!("No cart in tab {}: {}", tab.id, e);
                (String::new(), false, tab.is_restricted() || is_settled(&e))
            }
        };

        if let Err(e) = self.sink.set_text(&tab.id, &text) {
            tracing::debug!("Badge text not set: {}", e);
            return settled;
        }
        if has_cart {
            if let Err(e) = self.sink.set_color(&tab.id, &self.color) {
                tracing::debug!("Badge colour not set: {}", e);
            }
        }
        settled
    }

    async fn active_tab(&self) -> Option<TabInfo> {
        match self.client.bridge().host().active_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                tracing::debug!("Active tab unavailable: {}", e);
                None
            }
        }
    }

    /// Handle one event; returns the refreshed tab once its badge is final.
    pub async fn handle(&self, event: &BadgeEvent) -> Option<TabInfo> {
        tracing::debug!("Badge event: {:?}", event);
        let tab = self.active_tab().await?;
        self.update(&tab).await.then_some(tab)
    }

    /// Keep the badge current until `requests` and the poll loop are dropped.
    ///
    /// Tab activation and navigation are detected by polling the active tab
    /// every `poll_interval`; explicit update requests arrive on `requests`.
    pub async fn watch(&self, poll_interval: Duration, mut requests: mpsc::UnboundedReceiver<()>) {
        let mut last = self.handle(&BadgeEvent::Startup).await;

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = self.active_tab().await;
                    let mut settled = true;
                    if let Some(event) = detect_tab_change(last.as_ref(), current.as_ref()) {
                        tracing::debug!("Badge event: {:?}", event);
                        if let Some(tab) = &current {
                            settled = self.update(tab).await;
                        }
                    }
                    // An unsettled tab stays "changed" so the next tick reads it again.
                    if settled && current.is_some() {
                        last = current;
                    }
                }
                Some(()) = requests.recv() => {
                    if let Some(tab) = self.handle(&BadgeEvent::UpdateRequested).await {
                        last = Some(tab);
                    }
                }
            }
        }
    }
}
