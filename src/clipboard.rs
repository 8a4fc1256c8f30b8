use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{CartToolsError, Result};

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard helpers tried in order: (program, args, only when env var set).
const CANDIDATES: &[(&str, &[&str], Option<&str>)] = &[
    ("pbcopy", &[], None),
    ("clip.exe", &[], None),
    ("wl-copy", &[], Some("WAYLAND_DISPLAY")),
    ("xclip", &["-selection", "clipboard"], Some("DISPLAY")),
    ("xsel", &["--clipboard", "--input"], Some("DISPLAY")),
];

/// Writes to the desktop clipboard through the platform's copy utility.
#[derive(Debug, Clone, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn locate() -> Option<(PathBuf, &'static [&'static str])> {
        CANDIDATES.iter().find_map(|(program, args, env)| {
            if let Some(var) = env {
                std::env::var_os(var)?;
            }
            which::which(program).ok().map(|path| (path, *args))
        })
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        let (program, args) = Self::locate().ok_or_else(|| {
            CartToolsError::Clipboard(
                "no clipboard utility found (pbcopy, clip.exe, wl-copy, xclip or xsel)".to_string(),
            )
        })?;

        tracing::debug!("Copying {} bytes via {}", text.len(), program.display());

        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CartToolsError::Clipboard(format!("{}: {}", program.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| CartToolsError::Clipboard(e.to_string()))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CartToolsError::Clipboard(e.to_string()))?;
        if !status.success() {
            return Err(CartToolsError::Clipboard(format!(
                "{} exited with {}",
                program.display(),
                status
            )));
        }

        Ok(())
    }
}
