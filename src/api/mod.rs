pub mod client;
pub mod types;

pub use client::{Fetched, StorefrontClient, StrippedAttributes};
pub use types::{
    badge_text, format_minor_units, format_price, format_summary, pluralize,
    product_handle_from_path, Cart, CartItem, PageContext, Product, Variant,
};
