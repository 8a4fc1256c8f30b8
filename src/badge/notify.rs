use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::{CartToolsError, Result};

pub const UPDATE_BADGE: &str = "updateBadge";

pub const DEFAULT_NOTIFY_PORT: u16 = 19233;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// One line on the notification socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeMessage {
    pub action: String,
}

impl BadgeMessage {
    pub fn update() -> Self {
        Self {
            action: UPDATE_BADGE.to_string(),
        }
    }

    /// Parse a line; anything that is not an update request is ignored.
    pub fn is_update_request(line: &str) -> bool {
        serde_json::from_str::<BadgeMessage>(line.trim())
            .map(|m| m.action == UPDATE_BADGE)
            .unwrap_or(false)
    }
}

/// Tells the badge watcher that the cart changed.
pub trait BadgeNotifier: Send + Sync {
    /// Fire and forget; never fails from the caller's point of view.
    fn notify_badge_update(&self);
}

/// Sends `{"action":"updateBadge"}` to a watcher on the loopback interface.
#[derive(Debug, Clone)]
pub struct LoopbackNotifier {
    port: u16,
}

impl LoopbackNotifier {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn send(port: u16) -> Result<()> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| CartToolsError::Other(format!("Connecting to {} timed out", addr)))??;

        let mut line = serde_json::to_string(&BadgeMessage::update())?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

impl BadgeNotifier for LoopbackNotifier {
    fn notify_badge_update(&self) {
        let port = self.port;
        tokio::spawn(async move {
            // Nobody may be listening; that is fine.
            if let Err(e) = LoopbackNotifier::send(port).await {
                tracing::debug!("Badge notification not delivered: {}", e);
            }
        });
    }
}

/// Accept notification connections and forward update requests to `tx`.
///
/// Runs until the receiving side is dropped or accepting fails.
pub async fn listen(listener: TcpListener, tx: mpsc::UnboundedSender<()>) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| CartToolsError::Other(format!("Accept failed: {}", e)))?;

        if !peer.ip().is_loopback() {
            tracing::warn!("Rejected non-loopback connection from {}", peer);
            continue;
        }
        if tx.is_closed() {
            return Ok(());
        }

        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if BadgeMessage::is_update_request(&line) {
                    tracing::debug!("Badge update requested by {}", peer);
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            }
        });
    }
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| CartToolsError::Other(format!("Failed to bind to {}: {}", addr, e)))
}
