//! Page operations: named, serializable descriptors run inside the page.
//!
//! The host never ships code built at call time. Every descriptor is
//! dispatched by the same bundled page runtime (`page_runtime.js`), which
//! answers with an outcome envelope decoded by [`PageOutcome`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CartToolsError, Result};

/// Page-side runtime; an async arrow function taking one descriptor.
const PAGE_RUNTIME: &str = include_str!("page_runtime.js");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PageOperation {
    /// `GET /cart.js`.
    ReadCart,
    /// `GET /cart.js` and print it to the page console.
    LogCart,
    /// `GET /cart.js` and print a one-line banner to the page console.
    LogInit,
    /// `POST /cart/clear.js`.
    ClearCart,
    /// `POST /cart/update.js` with `{ attributes }`.
    UpdateCartAttributes { attributes: BTreeMap<String, String> },
    /// `GET /products/{handle}.js`.
    ReadProduct { handle: String },
    /// `GET /products/{handle}.js` and print it to the page console.
    LogProduct { handle: String },
    /// Cart probe plus page path and platform detection.
    DetectContext,
    /// Overlay a feedback form on the page.
    ShowFeedback { url: String },
}

impl PageOperation {
    /// Human label used in progress and timeout messages.
    pub fn label(&self) -> &'static str {
        match self {
            PageOperation::ReadCart | PageOperation::LogCart | PageOperation::LogInit => {
                "Reading cart"
            }
            PageOperation::ClearCart => "Clearing cart",
            PageOperation::UpdateCartAttributes { .. } => "Updating cart attributes",
            PageOperation::ReadProduct { .. } | PageOperation::LogProduct { .. } => {
                "Reading product"
            }
            PageOperation::DetectContext => "Detecting page",
            PageOperation::ShowFeedback { .. } => "Opening feedback",
        }
    }

    /// Whether the operation changes server-side cart state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            PageOperation::ClearCart | PageOperation::UpdateCartAttributes { .. }
        )
    }

    /// JavaScript expression that runs this operation in the page and
    /// evaluates to its outcome envelope.
    pub fn to_expression(&self) -> Result<String> {
        let descriptor = serde_json::to_string(self)?;
        Ok(format!("({})({})", PAGE_RUNTIME.trim_end(), descriptor))
    }
}

/// Failure reported by the page runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageFailure {
    /// Non-2xx HTTP status.
    Transport { path: String, code: u16 },
    /// 2xx response whose body is not JSON.
    Decode {
        path: String,
        #[serde(default)]
        content_type: String,
    },
    /// `fetch` itself rejected.
    Network { path: String, message: String },
    /// Anything the runtime could not classify.
    Script { message: String },
}

impl From<PageFailure> for CartToolsError {
    fn from(failure: PageFailure) -> Self {
        match failure {
            PageFailure::Transport { path, code } => CartToolsError::Transport { status: code, path },
            PageFailure::Decode { path, content_type } => {
                CartToolsError::Decode { content_type, path }
            }
            PageFailure::Network { path, message } => CartToolsError::PageNetwork { path, message },
            PageFailure::Script { message } => CartToolsError::JavaScriptError(message),
        }
    }
}

/// Envelope every page handler resolves to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Ok { value: Value },
    Failed { error: PageFailure },
}

impl PageOutcome {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            CartToolsError::JavaScriptError(format!("Unexpected page response: {}", e))
        })
    }

    pub fn into_result(self) -> Result<Value> {
        match self {
            PageOutcome::Ok { value } => Ok(value),
            PageOutcome::Failed { error } => Err(error.into()),
        }
    }
}

/// Result of the `DetectContext` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextProbe {
    pub cart: PageOutcome,
    #[serde(default)]
    pub pathname: String,
    #[serde(default)]
    pub platform_global: bool,
}
