//! Notifier that writes messages to the log

use super::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;

/// Logs each notification at info level
///
/// Used when no mail gateway is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let to = if address.is_empty() { "<unset>" } else { address };
        log::info!("📧 Notification to {}: {}", to, subject);
        log::debug!("{}", body);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "log"
    }
}
