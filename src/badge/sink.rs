use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::{CartToolsError, Result};

/// Where badge text and colour end up.
pub trait BadgeSink: Send + Sync {
    fn set_text(&self, tab_id: &str, text: &str) -> Result<()>;
    fn set_color(&self, tab_id: &str, color: &str) -> Result<()>;
}

/// Status-bar line, compatible with waybar/i3blocks style JSON blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BadgeLine {
    pub text: String,
    pub tooltip: String,
    pub class: String,
    pub color: String,
}

/// Emits one JSON line per badge change to a writer (stdout by default).
///
/// The terminal only has one badge, so the most recently updated tab wins.
pub struct StatusLineBadge<W: Write + Send> {
    out: Mutex<W>,
    current: Mutex<BadgeLine>,
}

impl StatusLineBadge<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> StatusLineBadge<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            current: Mutex::new(BadgeLine::default()),
        }
    }

    pub fn current(&self) -> BadgeLine {
        self.current
            .lock()
            .map(|line| line.clone())
            .unwrap_or_default()
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, change: impl FnOnce(&mut BadgeLine)) -> Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| CartToolsError::Other("badge state poisoned".to_string()))?;
        let before = current.clone();
        change(&mut current);
        if *current == before {
            return Ok(());
        }

        let line = serde_json::to_string(&*current)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| CartToolsError::Other("badge output poisoned".to_string()))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> BadgeSink for StatusLineBadge<W> {
    fn set_text(&self, tab_id: &str, text: &str) -> Result<()> {
        self.update(|line| {
            line.text = text.to_string();
            line.class = if text.is_empty() { "empty" } else { "cart" }.to_string();
            line.tooltip = if text.is_empty() {
                format!("No cart items (tab {})", tab_id)
            } else {
                format!("{} in cart (tab {})", text, tab_id)
            };
        })
    }

    fn set_color(&self, _tab_id: &str, color: &str) -> Result<()> {
        self.update(|line| line.color = color.to_string())
    }
}
