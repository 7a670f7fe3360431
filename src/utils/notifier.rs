//! Receipt notifier implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::traits::ReceiptNotifier;
use crate::types::NotifyError;

/// Notifier that writes receipts to the `tracing` log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ReceiptNotifier for LoggingNotifier {
    async fn send_receipt(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipient,
            subject,
            body_len = html_body.len(),
            "receipt dispatched"
        );
        Ok(())
    }
}

/// A receipt captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentReceipt {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Default)]
struct Recording {
    sent: Vec<SentReceipt>,
    failing: bool,
}

/// Notifier that keeps every receipt in memory; can be switched to fail
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing = failing;
        }
    }

    /// Receipts delivered so far
    pub fn sent(&self) -> Vec<SentReceipt> {
        self.inner
            .lock()
            .map(|inner| inner.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReceiptNotifier for RecordingNotifier {
    async fn send_receipt(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| NotifyError("recorder lock poisoned".to_string()))?;
        if inner.failing {
            return Err(NotifyError(format!("mailbox unavailable for {}", recipient)));
        }
        inner.sent.push(SentReceipt {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}
