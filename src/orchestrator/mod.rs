//! Popup controller: runs user actions against the page under a bounded wait
//! and keeps the status line, summary and controls in step.

pub mod controls;
pub mod timeout;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{format_summary, pluralize, Cart, Fetched, PageContext, Product, StorefrontClient};
use crate::badge::BadgeNotifier;
use crate::browser::PageHost;
use crate::clipboard::Clipboard;
use crate::error::{CartToolsError, ErrorKind, Result};

pub use controls::{lock, Action, Controls, CopyFeedback, Section, SharedControls, COPIED_LABEL, COPIED_REVERT};
pub use timeout::with_timeout;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const NOT_A_STORE: &str = "Visit a Shopify store to use this extension";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
    /// Failure kind behind an error status.
    pub error: Option<ErrorKind>,
}

impl Status {
    fn new(message: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            message: message.into(),
            kind,
            error: None,
        }
    }

    fn failure(error: &CartToolsError) -> Self {
        Self {
            message: error.status_message(),
            kind: StatusKind::Error,
            error: Some(error.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }

    /// Turn an error status back into an error for exit-code purposes.
    pub fn to_error(&self) -> Option<CartToolsError> {
        self.error.map(|kind| CartToolsError::ActionFailed {
            kind,
            message: self.message.clone(),
        })
    }
}

/// Summary line under the popup title. Muted when it is a hint rather than
/// cart data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub muted: bool,
}

/// What an action left behind for the caller to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Cart(Cart),
    Product(Product),
    Failed,
    /// The popup is being torn down; nothing should be re-rendered.
    Closed,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub timeout: Duration,
    pub feedback_url: Option<String>,
    pub copied_revert: Duration,
    /// Draw a spinner on stderr while an action is in flight.
    pub spinner: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            feedback_url: None,
            copied_revert: COPIED_REVERT,
            spinner: false,
        }
    }
}

pub struct Controller<H, C, N> {
    client: StorefrontClient<H>,
    clipboard: C,
    notifier: N,
    settings: ControllerSettings,
    controls: SharedControls,
    copy_feedback: CopyFeedback,
    status: Option<Status>,
    summary: Summary,
    context: Option<PageContext>,
    closed: bool,
    spinner: Option<ProgressBar>,
}

impl<H, C, N> Controller<H, C, N>
where
    H: PageHost + Clone + 'static,
    C: Clipboard,
    N: BadgeNotifier,
{
    pub fn new(client: StorefrontClient<H>, clipboard: C, notifier: N, settings: ControllerSettings) -> Self {
        Self {
            client,
            clipboard,
            notifier,
            settings,
            controls: Arc::new(Mutex::new(Controls::default())),
            copy_feedback: CopyFeedback::default(),
            status: None,
            summary: Summary {
                text: "Checking page…".to_string(),
                muted: true,
            },
            context: None,
            closed: false,
            spinner: None,
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn context(&self) -> Option<&PageContext> {
        self.context.as_ref()
    }

    pub fn controls(&self) -> &SharedControls {
        &self.controls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Detect what the active page supports and show the matching sections.
    pub async fn init(&mut self) {
        let client = self.client.clone();
        let detected = with_timeout(
            async move { client.detect_context().await },
            self.settings.timeout,
            "Detecting page",
        )
        .await;

        match detected {
            Ok(context) => {
                self.apply_context(&context);
                if context.has_cart {
                    // Console banner only; nobody waits for it.
                    let client = self.client.clone();
                    tokio::spawn(async move {
                        if let Err(e) = client.log_init().await {
                            tracing::debug!("Init banner not logged: {}", e);
                        }
                    });
                }
                self.context = Some(context);
            }
            Err(e) => {
                tracing::debug!("Page detection failed: {}", e);
                lock(&self.controls).set_sections(false, false);
                self.summary = Summary {
                    text: NOT_A_STORE.to_string(),
                    muted: true,
                };
            }
        }
    }

    fn apply_context(&mut self, context: &PageContext) {
        // Off-store pages get neither section, even on a `/products/...` path.
        lock(&self.controls).set_sections(
            context.is_shopify && context.has_cart,
            context.is_shopify && context.is_product_page,
        );

        self.summary = match (&context.cart, context.is_shopify) {
            (Some(cart), _) => Summary {
                text: format_summary(cart),
                muted: false,
            },
            (None, true) if context.is_product_page => Summary {
                text: "Product page".to_string(),
                muted: true,
            },
            (None, true) => Summary {
                text: "Shopify store".to_string(),
                muted: true,
            },
            (None, false) => Summary {
                text: NOT_A_STORE.to_string(),
                muted: true,
            },
        };
    }

    /// Run one user action to completion. Never fails: errors end up in the
    /// status line and as `Completion::Failed`.
    pub async fn perform(&mut self, action: Action) -> Completion {
        if self.closed {
            return Completion::Closed;
        }

        self.begin(action.progress_message());
        let completion = match self.execute(action).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::debug!("{:?} failed: {}", action, e);
                self.status = Some(Status::failure(&e));
                Completion::Failed
            }
        };
        self.finish();

        if completion != Completion::Closed {
            lock(&self.controls).set_enabled(true);
        }
        completion
    }

    async fn execute(&mut self, action: Action) -> Result<Completion> {
        let completion = match action {
            Action::LogCart => {
                let cart = self.timed("Reading cart", false, |c| async move { c.log_cart().await }).await?;
                self.show_cart(&cart);
                self.set_status(
                    format!("Logged to page console. Items: {}", cart.items.len()),
                    StatusKind::Success,
                );
                Completion::Cart(cart)
            }
            Action::CopyCart => {
                let Fetched { value: cart, raw } =
                    self.timed("Reading cart", false, |c| async move { c.fetch_cart().await }).await?;
                self.copy_json(&raw, action).await?;
                self.show_cart(&cart);
                self.set_status("Cart JSON copied to clipboard.", StatusKind::Success);
                Completion::Cart(cart)
            }
            Action::ClearCart => {
                let cart = self.timed("Clearing cart", true, |c| async move { c.clear_cart().await }).await?;
                self.show_cart(&cart);
                self.set_status("Cart cleared. Reloading page…", StatusKind::Success);
                self.after_mutation().await;
                Completion::Cart(cart)
            }
            Action::StripAttributes => {
                let stripped = self
                    .timed("Removing cart attributes", true, |c| async move {
                        c.strip_cart_attributes().await
                    })
                    .await?;
                self.show_cart(&stripped.cart);
                self.set_status(
                    format!(
                        "Removed {}. Reloading page…",
                        pluralize(stripped.removed.len() as u64, "cart attribute")
                    ),
                    StatusKind::Success,
                );
                self.after_mutation().await;
                Completion::Cart(stripped.cart)
            }
            Action::LogProduct => {
                let product = self.timed("Reading product", false, |c| async move { c.log_product().await }).await?;
                let title = if product.title.is_empty() { "Product" } else { product.title.as_str() };
                self.set_status(format!("Logged to page console: {}", title), StatusKind::Success);
                Completion::Product(product)
            }
            Action::CopyProduct => {
                let Fetched { value: product, raw } =
                    self.timed("Reading product", false, |c| async move { c.fetch_product().await }).await?;
                self.copy_json(&raw, action).await?;
                self.set_status("Product JSON copied to clipboard.", StatusKind::Success);
                Completion::Product(product)
            }
            Action::ListSkus => {
                let product = self.timed("Reading product", false, |c| async move { c.read_product().await }).await?;
                let with_sku = product
                    .variants
                    .iter()
                    .filter(|v| v.sku.as_deref().is_some_and(|s| !s.is_empty()))
                    .count();
                self.set_status(
                    format!(
                        "{}, {} with SKU",
                        pluralize(product.variants.len() as u64, "variant"),
                        with_sku
                    ),
                    StatusKind::Success,
                );
                Completion::Product(product)
            }
            Action::Feedback => {
                let url = self.settings.feedback_url.clone().ok_or_else(|| {
                    CartToolsError::ConfigError(
                        "feedback.url is not set. Run: cart-tools config set feedback.url <URL>".to_string(),
                    )
                })?;
                self.timed("Opening feedback", false, move |c| async move { c.show_feedback(&url).await })
                    .await?;
                self.set_status("Feedback form opened in the page.", StatusKind::Success);
                self.close();
                Completion::Closed
            }
        };
        Ok(completion)
    }

    async fn timed<T, F, Fut>(&self, label: &str, mutating: bool, call: F) -> Result<T>
    where
        F: FnOnce(StorefrontClient<H>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let result = with_timeout(call(self.client.clone()), self.settings.timeout, label).await;
        if mutating {
            if let Err(CartToolsError::Timeout { .. }) = &result {
                tracing::warn!(
                    "{} timed out; the request was not cancelled and may still change the cart",
                    label
                );
            }
        }
        result
    }

    /// Copy the store's JSON as received, not the typed re-serialization.
    async fn copy_json(&mut self, raw: &serde_json::Value, action: Action) -> Result<()> {
        let json = serde_json::to_string_pretty(raw)?;
        self.clipboard.write_text(&json).await?;
        self.copy_feedback
            .flash(&self.controls, action, self.settings.copied_revert);
        Ok(())
    }

    /// Refresh the badge and reload the tab after the cart changed.
    async fn after_mutation(&self) {
        self.notifier.notify_badge_update();
        if let Err(e) = self.client.reload_active_tab().await {
            tracing::warn!("Tab reload failed: {}", e);
        }
    }

    fn show_cart(&mut self, cart: &Cart) {
        self.summary = Summary {
            text: format_summary(cart),
            muted: false,
        };
    }

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.status = Some(Status::new(message, kind));
    }

    fn begin(&mut self, message: &str) {
        self.set_status(message, StatusKind::Info);
        lock(&self.controls).set_enabled(false);
        if self.settings.spinner {
            self.spinner = Some(create_spinner(message));
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.copy_feedback.cancel();
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("  {spinner} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::browser::PageOperation;
    use crate::testing::{CountingNotifier, FakeStore, MemoryClipboard};

    type TestController = Controller<FakeStore, MemoryClipboard, CountingNotifier>;

    fn controller(store: &FakeStore) -> (TestController, MemoryClipboard, CountingNotifier) {
        controller_with(store, MemoryClipboard::default(), ControllerSettings::default())
    }

    fn controller_with(
        store: &FakeStore,
        clipboard: MemoryClipboard,
        settings: ControllerSettings,
    ) -> (TestController, MemoryClipboard, CountingNotifier) {
        let notifier = CountingNotifier::default();
        let ctl = Controller::new(
            StorefrontClient::new(store.clone()),
            clipboard.clone(),
            notifier.clone(),
            settings,
        );
        (ctl, clipboard, notifier)
    }

    fn status(ctl: &TestController) -> Status {
        ctl.status().cloned().unwrap()
    }

    fn store_with_cart() -> FakeStore {
        FakeStore::at("https://shop.example.com/products/blue-shirt")
            .with_cart(json!({
                "item_count": 3,
                "total_price": 4200,
                "currency": "USD",
                "attributes": { "gift_note": "hi" },
                "items": [
                    { "title": "Blue Shirt", "quantity": 2, "price": 1500 },
                    { "title": "Hat", "quantity": 1, "price": 1200, "vendor": "Acme" }
                ],
                "token": "abc123"
            }))
            .with_product(json!({
                "title": "Blue Shirt",
                "available": true,
                "variants": [
                    { "title": "S", "sku": "BS-S", "price": 1500, "available": true },
                    { "title": "M", "sku": "", "price": 1500, "available": false }
                ]
            }))
    }

    #[tokio::test]
    async fn init_shows_sections_and_summary() {
        let store = store_with_cart();
        let (mut ctl, _, _) = controller(&store);

        ctl.init().await;

        let controls = lock(ctl.controls());
        assert!(controls.is_visible(Action::ClearCart));
        assert!(controls.is_visible(Action::ListSkus));
        drop(controls);
        assert_eq!(ctl.summary().text, "3 items · USD 42.00");
        assert!(!ctl.summary().muted);
        assert!(ctl.context().unwrap().has_cart);
    }

    #[tokio::test]
    async fn init_on_restricted_page_hides_everything() {
        let store = FakeStore::at("chrome://extensions/");
        let (mut ctl, _, _) = controller(&store);

        ctl.init().await;

        assert_eq!(lock(ctl.controls()).available(), vec![Action::Feedback]);
        assert_eq!(ctl.summary().text, NOT_A_STORE);
        assert!(ctl.summary().muted);
    }

    #[tokio::test]
    async fn init_on_non_store_page() {
        let store = FakeStore::at("https://blog.example.com/").with_html_cart();
        let (mut ctl, _, _) = controller(&store);

        ctl.init().await;

        assert!(!lock(ctl.controls()).is_visible(Action::LogCart));
        assert_eq!(ctl.summary().text, NOT_A_STORE);
    }

    #[tokio::test]
    async fn product_path_off_store_offers_no_product_tools() {
        let store = FakeStore::at("https://blog.example.com/products/hat").with_html_cart();
        let (mut ctl, _, _) = controller(&store);

        ctl.init().await;

        assert!(!ctl.context().unwrap().is_shopify);
        assert_eq!(ctl.summary().text, NOT_A_STORE);
        assert_eq!(lock(ctl.controls()).available(), vec![Action::Feedback]);
    }

    #[tokio::test]
    async fn copied_json_is_exactly_what_the_store_sent() {
        let store = FakeStore::at("https://shop.example.com/products/hat")
            .with_cart(json!({
                "item_count": 1,
                "items": [{ "price": 500, "quantity": 1, "title": "Hat" }]
            }))
            .with_product(json!({ "title": "Hat", "variants": [{ "title": "One", "price": 500 }] }));
        let (mut ctl, clipboard, _) = controller(&store);

        ctl.perform(Action::CopyCart).await;
        let copied: Value = serde_json::from_str(&clipboard.contents().unwrap()).unwrap();
        assert_eq!(copied, store.cart_json().unwrap());

        ctl.perform(Action::CopyProduct).await;
        let copied: Value = serde_json::from_str(&clipboard.contents().unwrap()).unwrap();
        assert_eq!(
            copied,
            json!({ "title": "Hat", "variants": [{ "title": "One", "price": 500 }] })
        );
    }

    #[tokio::test]
    async fn copy_cart_round_trips_through_clipboard() {
        let store = store_with_cart();
        let (mut ctl, clipboard, notifier) = controller(&store);

        assert!(matches!(ctl.perform(Action::CopyCart).await, Completion::Cart(_)));

        let copied: Cart = serde_json::from_str(&clipboard.contents().unwrap()).unwrap();
        let served: Cart = serde_json::from_value(store.cart_json().unwrap()).unwrap();
        assert_eq!(copied, served);
        assert_eq!(copied.extra["token"], Value::from("abc123"));
        assert_eq!(copied.items[1].extra["vendor"], Value::from("Acme"));

        assert_eq!(status(&ctl).kind, StatusKind::Success);
        assert_eq!(lock(ctl.controls()).label(Action::CopyCart), COPIED_LABEL);
        assert!(lock(ctl.controls()).is_enabled());
        assert_eq!(notifier.count(), 0);
        assert_eq!(store.reloads(), 0);
    }

    #[tokio::test]
    async fn clipboard_failure_is_reported() {
        let store = store_with_cart();
        let (mut ctl, _, _) =
            controller_with(&store, MemoryClipboard::broken(), ControllerSettings::default());

        assert_eq!(ctl.perform(Action::CopyProduct).await, Completion::Failed);
        assert_eq!(status(&ctl).error, Some(ErrorKind::ClipboardError));
        assert!(lock(ctl.controls()).is_enabled());
    }

    #[tokio::test]
    async fn clear_cart_notifies_badge_and_reloads() {
        let store = store_with_cart();
        let (mut ctl, _, notifier) = controller(&store);

        match ctl.perform(Action::ClearCart).await {
            Completion::Cart(cart) => assert_eq!(cart.item_count, 0),
            other => panic!("unexpected completion: {:?}", other),
        }

        assert_eq!(ctl.summary().text, "0 items · USD 0.00");
        assert_eq!(notifier.count(), 1);
        assert_eq!(store.reloads(), 1);
        assert!(status(&ctl).message.starts_with("Cart cleared"));
    }

    #[tokio::test]
    async fn strip_attributes_on_bare_cart_reports_and_skips_reload() {
        let store = FakeStore::at("https://shop.example.com/")
            .with_cart(json!({ "item_count": 1, "attributes": {} }));
        let (mut ctl, _, notifier) = controller(&store);

        assert_eq!(ctl.perform(Action::StripAttributes).await, Completion::Failed);

        assert_eq!(status(&ctl).error, Some(ErrorKind::NoCartAttributes));
        assert_eq!(store.operations(), vec![PageOperation::ReadCart]);
        assert_eq!(notifier.count(), 0);
        assert_eq!(store.reloads(), 0);
    }

    #[tokio::test]
    async fn strip_attributes_reports_count() {
        let store = store_with_cart();
        let (mut ctl, _, notifier) = controller(&store);

        ctl.perform(Action::StripAttributes).await;

        assert_eq!(status(&ctl).message, "Removed 1 cart attribute. Reloading page…");
        assert_eq!(notifier.count(), 1);
        assert_eq!(store.reloads(), 1);
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_status() {
        let store = FakeStore::at("https://shop.example.com/").with_cart_status(404);
        let (mut ctl, _, _) = controller(&store);

        assert_eq!(ctl.perform(Action::LogCart).await, Completion::Failed);
        let st = status(&ctl);
        assert!(st.is_error());
        assert_eq!(st.error, Some(ErrorKind::TransportError));
        assert!(st.message.contains("404"));
    }

    #[tokio::test]
    async fn product_actions_need_a_product_page() {
        let store = FakeStore::at("https://shop.example.com/cart");
        let (mut ctl, _, _) = controller(&store);

        ctl.perform(Action::LogProduct).await;
        assert_eq!(status(&ctl).error, Some(ErrorKind::NotAProductPage));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn list_skus_returns_product() {
        let store = store_with_cart();
        let (mut ctl, _, _) = controller(&store);

        match ctl.perform(Action::ListSkus).await {
            Completion::Product(product) => assert_eq!(product.variants.len(), 2),
            other => panic!("unexpected completion: {:?}", other),
        }
        assert_eq!(status(&ctl).message, "2 variants, 1 with SKU");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_clear_times_out_but_still_lands() {
        let store = store_with_cart().with_delay(Duration::from_secs(15));
        let (mut ctl, _, notifier) = controller(&store);

        assert_eq!(ctl.perform(Action::ClearCart).await, Completion::Failed);
        let st = status(&ctl);
        assert_eq!(st.error, Some(ErrorKind::Timeout));
        assert!(st.message.contains("Clearing cart timed out after 10000ms"));
        assert_eq!(notifier.count(), 0);
        assert_eq!(store.reloads(), 0);
        assert!(lock(ctl.controls()).is_enabled());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.cart_json().unwrap()["item_count"], 0);
    }

    #[tokio::test]
    async fn feedback_without_url_is_config_error() {
        let store = store_with_cart();
        let (mut ctl, _, _) = controller(&store);

        assert_eq!(ctl.perform(Action::Feedback).await, Completion::Failed);
        assert!(status(&ctl).message.contains("feedback.url"));
        assert!(!ctl.is_closed());
    }

    #[tokio::test]
    async fn feedback_closes_popup() {
        let store = store_with_cart();
        let settings = ControllerSettings {
            feedback_url: Some("https://forms.example.com/f".to_string()),
            ..Default::default()
        };
        let (mut ctl, _, _) = controller_with(&store, MemoryClipboard::default(), settings);

        assert_eq!(ctl.perform(Action::Feedback).await, Completion::Closed);
        assert_eq!(store.feedback_urls(), vec!["https://forms.example.com/f".to_string()]);
        assert!(ctl.is_closed());
        assert!(!lock(ctl.controls()).is_enabled());
        assert_eq!(ctl.perform(Action::CopyCart).await, Completion::Closed);
    }
}
