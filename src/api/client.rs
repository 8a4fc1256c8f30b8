use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::types::{product_handle_from_path, Cart, PageContext, Product};
use crate::browser::operation::ContextProbe;
use crate::browser::{ContextBridge, PageHost, PageOperation, PageOutcome, TabInfo};
use crate::error::{CartToolsError, Result};

/// Cart after its attributes were blanked.
#[derive(Debug, Clone)]
pub struct StrippedAttributes {
    pub removed: Vec<String>,
    pub cart: Cart,
}

/// A decoded resource alongside the JSON the store actually sent.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub raw: serde_json::Value,
}

impl<T: DeserializeOwned> Fetched<T> {
    fn decode(raw: serde_json::Value) -> Result<Self> {
        let value = decode(raw.clone())?;
        Ok(Self { value, raw })
    }
}

/// Typed storefront operations on top of the context bridge.
///
/// Each call checks the page outcome (HTTP status, JSON body) and the
/// resource shape itself; the bridge only moves values around.
#[derive(Debug, Clone)]
pub struct StorefrontClient<H> {
    bridge: ContextBridge<H>,
}

impl<H: PageHost> StorefrontClient<H> {
    pub fn new(host: H) -> Self {
        Self {
            bridge: ContextBridge::new(host),
        }
    }

    pub fn bridge(&self) -> &ContextBridge<H> {
        &self.bridge
    }

    async fn call_raw(&self, operation: PageOperation) -> Result<serde_json::Value> {
        let envelope = self.bridge.run_in_page(&operation).await?;
        PageOutcome::from_value(envelope)?.into_result()
    }

    async fn call<T: DeserializeOwned>(&self, operation: PageOperation) -> Result<T> {
        decode(self.call_raw(operation).await?)
    }

    pub async fn read_cart(&self) -> Result<Cart> {
        self.call(PageOperation::ReadCart).await
    }

    /// Read the cart and keep the body verbatim for copying.
    pub async fn fetch_cart(&self) -> Result<Fetched<Cart>> {
        Fetched::decode(self.call_raw(PageOperation::ReadCart).await?)
    }

    /// Read the cart of a specific tab (badge updates target tabs directly).
    pub async fn read_cart_in(&self, tab: &TabInfo) -> Result<Cart> {
        let envelope = self.bridge.run_in_tab(tab, &PageOperation::ReadCart).await?;
        decode(PageOutcome::from_value(envelope)?.into_result()?)
    }

    /// Read the cart and print it to the page's own console.
    pub async fn log_cart(&self) -> Result<Cart> {
        self.call(PageOperation::LogCart).await
    }

    pub async fn log_init(&self) -> Result<Cart> {
        self.call(PageOperation::LogInit).await
    }

    pub async fn clear_cart(&self) -> Result<Cart> {
        self.call(PageOperation::ClearCart).await
    }

    /// Blank every cart attribute. Fails with `NoCartAttributes` without
    /// writing anything when the cart carries none.
    pub async fn strip_cart_attributes(&self) -> Result<StrippedAttributes> {
        let cart = self.read_cart().await?;
        if cart.attributes.is_empty() {
            return Err(CartToolsError::NoCartAttributes);
        }

        let attributes: BTreeMap<String, String> = cart
            .attributes
            .keys()
            .map(|k| (k.clone(), String::new()))
            .collect();
        let removed = attributes.keys().cloned().collect();

        let cart = self
            .call(PageOperation::UpdateCartAttributes { attributes })
            .await?;
        Ok(StrippedAttributes { removed, cart })
    }

    /// Handle of the product shown in the active tab.
    pub async fn product_handle(&self) -> Result<String> {
        let tab = self.bridge.active_tab().await?;
        product_handle_from_path(&tab.path()).ok_or(CartToolsError::NotAProductPage)
    }

    pub async fn read_product(&self) -> Result<Product> {
        let handle = self.product_handle().await?;
        self.call(PageOperation::ReadProduct { handle }).await
    }

    pub async fn fetch_product(&self) -> Result<Fetched<Product>> {
        let handle = self.product_handle().await?;
        Fetched::decode(self.call_raw(PageOperation::ReadProduct { handle }).await?)
    }

    pub async fn log_product(&self) -> Result<Product> {
        let handle = self.product_handle().await?;
        self.call(PageOperation::LogProduct { handle }).await
    }

    /// Snapshot of what the active page supports.
    ///
    /// A failed cart probe is recorded in the context rather than returned
    /// as an error; only bridge failures (no tab, restricted page) are.
    pub async fn detect_context(&self) -> Result<PageContext> {
        let probe: ContextProbe = self.call(PageOperation::DetectContext).await?;
        let cart = probe
            .cart
            .into_result()
            .and_then(decode::<Cart>)
            .map_err(|e| e.to_string());

        Ok(PageContext::from_probe(
            cart,
            &probe.pathname,
            probe.platform_global,
        ))
    }

    pub async fn show_feedback(&self, url: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(PageOperation::ShowFeedback {
                url: url.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn reload_active_tab(&self) -> Result<()> {
        self.bridge.reload_active_tab().await
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(CartToolsError::from)
}
