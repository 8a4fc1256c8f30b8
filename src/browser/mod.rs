pub mod bridge;
pub mod cdp;
pub mod host;
pub mod operation;

pub use bridge::ContextBridge;
pub use cdp::{normalize_endpoint, CdpHost, DEFAULT_CDP_ENDPOINT};
pub use host::{Injection, PageHost, TabInfo};
pub use operation::{PageFailure, PageOperation, PageOutcome};
