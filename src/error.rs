use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartToolsError {
    #[error("No active tab. Focus a browser tab and try again.")]
    NoActiveTab,

    #[error("Restricted page: {0}")]
    RestrictedPage(String),

    #[error("{label} timed out after {ms}ms")]
    Timeout { label: String, ms: u64 },

    #[error("HTTP {status} from {path}")]
    Transport { status: u16, path: String },

    #[error("Response from {path} was not JSON (content-type: {content_type})")]
    Decode { content_type: String, path: String },

    #[error("Request to {path} failed: {message}")]
    PageNetwork { path: String, message: String },

    #[error("Not on a product page. Visit a product page to use product tools.")]
    NotAProductPage,

    #[error("The cart has no attributes to remove.")]
    NoCartAttributes,

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("No result from page.")]
    NoResult,

    #[error("JavaScript execution failed: {0}")]
    JavaScriptError(String),

    #[error("CDP connection failed: {0}")]
    CdpConnectionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A popup action failed and its status line was already rendered.
    #[error("{message}")]
    ActionFailed { kind: ErrorKind, message: String },

    #[error("{0}")]
    Other(String),
}

/// Failure taxonomy shown to the user. Several error variants can share a
/// kind (e.g. every DevTools connectivity problem is `BrowserUnavailable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NoActiveTab,
    RestrictedPage,
    Timeout,
    TransportError,
    DecodeError,
    NotAProductPage,
    NoCartAttributes,
    ClipboardError,
    NoResult,
    PageScript,
    BrowserUnavailable,
    Config,
    Internal,
}

impl CartToolsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartToolsError::NoActiveTab => ErrorKind::NoActiveTab,
            CartToolsError::RestrictedPage(_) => ErrorKind::RestrictedPage,
            CartToolsError::Timeout { .. } => ErrorKind::Timeout,
            CartToolsError::Transport { .. } | CartToolsError::PageNetwork { .. } => {
                ErrorKind::TransportError
            }
            CartToolsError::Decode { .. } => ErrorKind::DecodeError,
            CartToolsError::NotAProductPage => ErrorKind::NotAProductPage,
            CartToolsError::NoCartAttributes => ErrorKind::NoCartAttributes,
            CartToolsError::Clipboard(_) => ErrorKind::ClipboardError,
            CartToolsError::NoResult => ErrorKind::NoResult,
            CartToolsError::JavaScriptError(_) => ErrorKind::PageScript,
            CartToolsError::CdpConnectionFailed(_) | CartToolsError::NetworkError(_) => {
                ErrorKind::BrowserUnavailable
            }
            CartToolsError::ConfigError(_) => ErrorKind::Config,
            CartToolsError::ActionFailed { kind, .. } => *kind,
            CartToolsError::IoError(_)
            | CartToolsError::JsonError(_)
            | CartToolsError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Short status-line text for this failure.
    pub fn status_message(&self) -> String {
        match self {
            CartToolsError::NoActiveTab => {
                "No active tab. Focus a browser tab and run cart-tools again.".to_string()
            }
            CartToolsError::RestrictedPage(url) => format!(
                "The browser does not allow cart tools on this page ({}). \
                 Switch to a storefront tab.",
                url
            ),
            CartToolsError::Timeout { label, ms } => format!(
                "{} timed out after {}ms. Check your connection and try again.",
                label, ms
            ),
            CartToolsError::Transport { status, path } => {
                format!("The store answered HTTP {} for {}.", status, path)
            }
            CartToolsError::PageNetwork { path, message } => {
                format!("Could not reach {} from the page: {}", path, message)
            }
            CartToolsError::Decode { content_type, path } => format!(
                "{} did not return JSON (got {}). Is this a Shopify storefront?",
                path,
                if content_type.is_empty() {
                    "no content type"
                } else {
                    content_type.as_str()
                }
            ),
            CartToolsError::CdpConnectionFailed(detail) => format!(
                "Cannot reach the browser ({}). Start it with --remote-debugging-port.",
                detail
            ),
            CartToolsError::ActionFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CartToolsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_carries_status() {
        let err = CartToolsError::Transport {
            status: 404,
            path: "/cart.js".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(err.status_message().contains("404"));
        assert!(err.status_message().contains("/cart.js"));
    }

    #[test]
    fn decode_message_carries_content_type() {
        let err = CartToolsError::Decode {
            content_type: "text/html; charset=utf-8".to_string(),
            path: "/cart.js".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert!(err.status_message().contains("text/html"));
    }

    #[test]
    fn decode_message_handles_missing_content_type() {
        let err = CartToolsError::Decode {
            content_type: String::new(),
            path: "/cart.js".to_string(),
        };
        assert!(err.status_message().contains("no content type"));
    }

    #[test]
    fn timeout_message_names_label_and_budget() {
        let err = CartToolsError::Timeout {
            label: "Clearing cart".to_string(),
            ms: 10_000,
        };
        let msg = err.status_message();
        assert!(msg.starts_with("Clearing cart timed out after 10000ms"));
        assert!(msg.contains("connection"));
    }

    #[test]
    fn restricted_page_is_distinct_from_generic_failures() {
        let restricted = CartToolsError::RestrictedPage("chrome://settings".to_string());
        let generic = CartToolsError::Other("boom".to_string());
        assert_eq!(restricted.kind(), ErrorKind::RestrictedPage);
        assert_eq!(generic.kind(), ErrorKind::Internal);
        assert!(restricted.status_message().contains("does not allow"));
    }
}
