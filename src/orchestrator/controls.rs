use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

pub const COPIED_LABEL: &str = "✓ Copied!";

/// How long a "copied" label stays before reverting.
pub const COPIED_REVERT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    LogCart,
    CopyCart,
    ClearCart,
    StripAttributes,
    LogProduct,
    CopyProduct,
    ListSkus,
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Cart,
    Product,
    General,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::LogCart,
        Action::CopyCart,
        Action::ClearCart,
        Action::StripAttributes,
        Action::LogProduct,
        Action::CopyProduct,
        Action::ListSkus,
        Action::Feedback,
    ];

    pub fn default_label(&self) -> &'static str {
        match self {
            Action::LogCart => "Log cart to page console",
            Action::CopyCart => "Copy cart JSON",
            Action::ClearCart => "Clear cart",
            Action::StripAttributes => "Remove cart attributes",
            Action::LogProduct => "Log product to page console",
            Action::CopyProduct => "Copy product JSON",
            Action::ListSkus => "View variants & SKUs",
            Action::Feedback => "Send feedback",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Action::LogCart | Action::CopyCart | Action::ClearCart | Action::StripAttributes => {
                Section::Cart
            }
            Action::LogProduct | Action::CopyProduct | Action::ListSkus => Section::Product,
            Action::Feedback => Section::General,
        }
    }

    /// Status shown while the action is in flight.
    pub fn progress_message(&self) -> &'static str {
        match self {
            Action::LogCart => "Reading cart…",
            Action::CopyCart => "Copying cart…",
            Action::ClearCart => "Clearing cart…",
            Action::StripAttributes => "Removing cart attributes…",
            Action::LogProduct | Action::ListSkus => "Reading product…",
            Action::CopyProduct => "Copying product…",
            Action::Feedback => "Opening feedback…",
        }
    }
}

/// Popup control state: labels, enabled flag and section visibility.
#[derive(Debug)]
pub struct Controls {
    labels: HashMap<Action, String>,
    enabled: bool,
    cart_visible: bool,
    product_visible: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            labels: Action::ALL
                .iter()
                .map(|a| (*a, a.default_label().to_string()))
                .collect(),
            enabled: true,
            cart_visible: false,
            product_visible: false,
        }
    }
}

impl Controls {
    pub fn label(&self, action: Action) -> &str {
        self.labels
            .get(&action)
            .map(String::as_str)
            .unwrap_or_else(|| action.default_label())
    }

    pub fn set_label(&mut self, action: Action, label: &str) {
        self.labels.insert(action, label.to_string());
    }

    pub fn reset_labels(&mut self) {
        for action in Action::ALL {
            self.labels.insert(action, action.default_label().to_string());
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_sections(&mut self, cart: bool, product: bool) {
        self.cart_visible = cart;
        self.product_visible = product;
    }

    pub fn is_visible(&self, action: Action) -> bool {
        match action.section() {
            Section::Cart => self.cart_visible,
            Section::Product => self.product_visible,
            Section::General => true,
        }
    }

    /// Actions the user can pick right now.
    pub fn available(&self) -> Vec<Action> {
        if !self.enabled {
            return Vec::new();
        }
        Action::ALL
            .into_iter()
            .filter(|a| self.is_visible(*a))
            .collect()
    }
}

/// Controls shared with the label-revert task.
pub type SharedControls = Arc<Mutex<Controls>>;

pub fn lock(controls: &SharedControls) -> MutexGuard<'_, Controls> {
    // A panic while holding the lock leaves plain data behind; keep using it.
    controls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks the single pending "copied" label revert.
#[derive(Debug, Default)]
pub struct CopyFeedback {
    pending: Option<JoinHandle<()>>,
}

impl CopyFeedback {
    /// Show the copied label on `action`, replacing any pending revert.
    pub fn flash(&mut self, controls: &SharedControls, action: Action, revert_after: Duration) {
        if let Some(previous) = self.pending.take() {
            previous.abort();
            lock(controls).reset_labels();
        }

        lock(controls).set_label(action, COPIED_LABEL);

        let controls = Arc::clone(controls);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(revert_after).await;
            lock(&controls).set_label(action, action.default_label());
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for CopyFeedback {
    fn drop(&mut self) {
        self.cancel();
    }
}
