pub mod onebot;

use anyhow::Result;
use async_trait::async_trait;

// Re-export commonly used types
pub use onebot::{LoginInfo, MessageTarget, OneBotClient};

/// Delivers plain-text alerts to operators.
///
/// Callers log failures and carry on; implementations never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}
