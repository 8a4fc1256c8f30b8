use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Currency shown when the store omits one.
const DEFAULT_CURRENCY: &str = "USD";

/// Cart as returned by `/cart.js`.
///
/// Fields the tool does not use are kept in `extra` so a cart copied to the
/// clipboard carries everything the store sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub item_count: u64,
    /// Minor currency units.
    pub total_price: i64,
    pub currency: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartItem {
    pub title: String,
    pub variant_title: Option<String>,
    pub quantity: u64,
    /// Minor currency units.
    pub price: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Product as returned by `/products/{handle}.js`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub title: String,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub vendor: Option<String>,
    pub available: bool,
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    pub title: String,
    pub sku: Option<String>,
    /// Minor currency units.
    pub price: i64,
    pub available: bool,
    pub inventory_quantity: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What the active tab offers, captured once when the popup opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageContext {
    pub is_shopify: bool,
    pub has_cart: bool,
    pub is_product_page: bool,
    pub product_handle: Option<String>,
    pub cart: Option<Cart>,
    /// Why the cart probe failed, when it did.
    pub error: Option<String>,
}

impl PageContext {
    /// Build a snapshot from the cart probe and the page path.
    ///
    /// `has_cart` implies `is_shopify`, and `is_product_page` is derived from
    /// the handle so the two can never disagree.
    pub fn from_probe(
        cart: std::result::Result<Cart, String>,
        pathname: &str,
        platform_global: bool,
    ) -> Self {
        let product_handle = product_handle_from_path(pathname);
        let (cart, error) = match cart {
            Ok(cart) => (Some(cart), None),
            Err(e) => (None, Some(e)),
        };
        let has_cart = cart.is_some();

        Self {
            is_shopify: has_cart || platform_global,
            has_cart,
            is_product_page: product_handle.is_some(),
            product_handle,
            cart,
            error,
        }
    }
}

fn is_locale_segment(segment: &str) -> bool {
    let (lang, region) = match segment.split_once('-') {
        Some((lang, region)) => (lang, Some(region)),
        None => (segment, None),
    };
    let lang_ok = lang.len() == 2 && lang.chars().all(|c| c.is_ascii_lowercase());
    let region_ok = region
        .map(|r| r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(true);
    lang_ok && region_ok
}

/// Extract the product handle from a storefront path.
///
/// Accepts `/products/h`, `/{locale}/products/h`,
/// `/collections/c/products/h` and `/{locale}/collections/c/products/h`.
pub fn product_handle_from_path(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let rest = match segments.split_first() {
        Some((first, rest)) if is_locale_segment(first) => rest,
        _ => segments.as_slice(),
    };

    let handle = match rest {
        ["products", handle] => *handle,
        ["collections", _, "products", handle] => *handle,
        _ => return None,
    };

    Some(handle.to_string())
}

/// Format minor units as a decimal with exactly two places.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn currency_or_default(currency: &str) -> &str {
    if currency.is_empty() {
        DEFAULT_CURRENCY
    } else {
        currency
    }
}

/// `"{currency} {amount}"` for a cart-level price.
pub fn format_price(cart: &Cart, amount: i64) -> String {
    format!(
        "{} {}",
        currency_or_default(&cart.currency),
        format_minor_units(amount)
    )
}

pub fn pluralize(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// One-line cart summary, e.g. `3 items · USD 42.00`.
pub fn format_summary(cart: &Cart) -> String {
    format!(
        "{} · {}",
        pluralize(cart.item_count, "item"),
        format_price(cart, cart.total_price)
    )
}

/// Toolbar badge text: blank for an empty cart.
pub fn badge_text(cart: &Cart) -> String {
    if cart.item_count == 0 {
        String::new()
    } else {
        cart.item_count.to_string()
    }
}
