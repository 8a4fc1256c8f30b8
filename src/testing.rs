//! In-memory storefront used by unit tests across modules.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::badge::BadgeNotifier;
use crate::browser::{Injection, PageHost, PageOperation, TabInfo};
use crate::clipboard::Clipboard;
use crate::error::{CartToolsError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status(u16),
    Html,
}

#[derive(Debug)]
struct State {
    url: Option<String>,
    cart: Reply,
    product: Reply,
    delay: Option<Duration>,
    operations: Vec<PageOperation>,
    reloads: usize,
    feedback: Vec<String>,
    /// Cart reads still to be refused as if the page were mid-navigation.
    interrupted_reads: usize,
}

/// Pretends to be a browser tab showing a storefront.
#[derive(Debug, Clone)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn at(url: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                url: Some(url.to_string()),
                cart: Reply::Json(json!({ "item_count": 0, "items": [], "attributes": {} })),
                product: Reply::Status(404),
                delay: None,
                operations: Vec::new(),
                reloads: 0,
                feedback: Vec::new(),
                interrupted_reads: 0,
            })),
        }
    }

    pub fn without_tab() -> Self {
        let store = Self::at("about:blank");
        store.state.lock().unwrap().url = None;
        store
    }

    pub fn with_cart(self, cart: Value) -> Self {
        self.state.lock().unwrap().cart = Reply::Json(cart);
        self
    }

    pub fn with_cart_status(self, status: u16) -> Self {
        self.state.lock().unwrap().cart = Reply::Status(status);
        self
    }

    pub fn with_html_cart(self) -> Self {
        self.state.lock().unwrap().cart = Reply::Html;
        self
    }

    pub fn with_product(self, product: Value) -> Self {
        self.state.lock().unwrap().product = Reply::Json(product);
        self
    }

    /// Every page operation waits this long before touching the store.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    /// Refuse the next `count` cart reads the way a page that is still
    /// loading refuses `Runtime.evaluate`.
    pub fn interrupt_reads(&self, count: usize) {
        self.state.lock().unwrap().interrupted_reads = count;
    }

    pub fn navigate(&self, url: &str) {
        self.state.lock().unwrap().url = Some(url.to_string());
    }

    pub fn operations(&self) -> Vec<PageOperation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state.lock().unwrap().reloads
    }

    pub fn feedback_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().feedback.clone()
    }

    pub fn cart_json(&self) -> Option<Value> {
        match &self.state.lock().unwrap().cart {
            Reply::Json(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn envelope(reply: &Reply, path: &str) -> Value {
        match reply {
            Reply::Json(value) => json!({ "status": "ok", "value": value }),
            Reply::Status(code) => json!({
                "status": "failed",
                "error": { "kind": "transport", "path": path, "code": code }
            }),
            Reply::Html => json!({
                "status": "failed",
                "error": { "kind": "decode", "path": path, "content_type": "text/html; charset=utf-8" }
            }),
        }
    }
}

#[async_trait]
impl PageHost for FakeStore {
    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        Ok(self.state.lock().unwrap().url.clone().map(|url| TabInfo {
            id: "TAB1".to_string(),
            title: "Fake store".to_string(),
            url,
            page_type: "page".to_string(),
            web_socket_debugger_url: None,
        }))
    }

    async fn inject(&self, tab: &TabInfo, operation: &PageOperation) -> Result<Injection> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.operations.push(operation.clone());

        if matches!(operation, PageOperation::ReadCart) && state.interrupted_reads > 0 {
            state.interrupted_reads -= 1;
            return Err(CartToolsError::RestrictedPage(tab.url.clone()));
        }

        let value = match operation {
            PageOperation::ReadCart | PageOperation::LogCart | PageOperation::LogInit => {
                Self::envelope(&state.cart, "/cart.js")
            }
            PageOperation::ClearCart => {
                if let Reply::Json(cart) = &mut state.cart {
                    cart["items"] = json!([]);
                    cart["item_count"] = json!(0);
                    cart["total_price"] = json!(0);
                }
                Self::envelope(&state.cart, "/cart/clear.js")
            }
            PageOperation::UpdateCartAttributes { attributes } => {
                if let Reply::Json(cart) = &mut state.cart {
                    if let Some(current) = cart.get_mut("attributes").and_then(|a| a.as_object_mut()) {
                        for (key, value) in attributes {
                            if value.is_empty() {
                                current.remove(key);
                            } else {
                                current.insert(key.clone(), json!(value));
                            }
                        }
                    }
                }
                Self::envelope(&state.cart, "/cart/update.js")
            }
            PageOperation::ReadProduct { handle } | PageOperation::LogProduct { handle } => {
                Self::envelope(&state.product, &format!("/products/{}.js", handle))
            }
            PageOperation::DetectContext => json!({
                "status": "ok",
                "value": {
                    "cart": Self::envelope(&state.cart, "/cart.js"),
                    "pathname": tab.path(),
                    "platform_global": false
                }
            }),
            PageOperation::ShowFeedback { url } => {
                state.feedback.push(url.clone());
                json!({ "status": "ok", "value": { "shown": true } })
            }
        };

        Ok(Injection::value(value))
    }

    async fn reload(&self, _tab: &TabInfo) -> Result<()> {
        self.state.lock().unwrap().reloads += 1;
        Ok(())
    }
}

/// Clipboard that keeps the last write in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
    broken: bool,
}

impl MemoryClipboard {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Default::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.broken {
            return Err(CartToolsError::Clipboard("clipboard unavailable".to_string()));
        }
        *self.contents.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

/// Counts badge refresh notifications.
#[derive(Debug, Clone, Default)]
pub struct CountingNotifier {
    count: Arc<Mutex<usize>>,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        *self.count.lock().unwrap()
    }
}

impl BadgeNotifier for CountingNotifier {
    fn notify_badge_update(&self) {
        *self.count.lock().unwrap() += 1;
    }
}
