pub mod remote;

pub mod capture;
pub mod comments;
pub mod execute;
pub mod history;
pub mod library;
pub mod nodes;
pub mod page;
pub mod registry;
pub mod targets;
pub mod viewport;

use async_trait::async_trait;
use figbridge_core::{Config, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub use registry::ToolRegistry;
pub use remote::sessions::SessionRegistry;

/// Shared handle to the per-process session registry. One instance is built
/// at startup and injected into every tool through the context; holding the
/// lock for the duration of a registry interaction serializes concurrent
/// ensure-active calls.
pub type SessionHandle = Arc<Mutex<SessionRegistry>>;

/// Truncate a string to at most `max_chars` bytes, respecting UTF-8 char
/// boundaries.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[derive(Clone)]
pub struct ToolContext {
    pub workspace: PathBuf,
    pub config: Config,
    pub sessions: SessionHandle,
}

impl ToolContext {
    /// Build a context with a fresh session registry wired to the configured
    /// debugging port.
    pub fn new(config: Config, workspace: PathBuf) -> Self {
        let registry = SessionRegistry::new(
            config.remote.port,
            config.remote.connect_attempts,
            Duration::from_millis(config.remote.connect_retry_delay_ms),
        );
        Self {
            workspace,
            config,
            sessions: Arc::new(Mutex::new(registry)),
        }
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate() {
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 3), "hel");
        // multi-byte chars must not be split
        assert_eq!(safe_truncate("héllo", 2), "h");
    }
}
