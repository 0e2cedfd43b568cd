//! Outbound messaging to the fixed order recipient.

pub mod whatsapp;

use async_trait::async_trait;

use crate::error::DeliveryError;

pub use whatsapp::WhatsAppClient;

/// What the vendor returned for a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    /// Media reference obtained by the upload phase (documents only).
    pub media_id: Option<String>,
    /// Vendor message id, when the response carries one.
    pub message_id: Option<String>,
    /// Raw JSON response of the message send.
    pub response: serde_json::Value,
}

impl SendReceipt {
    pub fn from_response(response: serde_json::Value) -> Self {
        let message_id = response
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .and_then(|m| m.first())
            .and_then(|m| m.get("id"))
            .and_then(serde_json::Value::as_str)
            .map(String::from);
        Self {
            media_id: None,
            message_id,
            response,
        }
    }

    pub fn with_media_id(mut self, media_id: impl Into<String>) -> Self {
        self.media_id = Some(media_id.into());
        self
    }
}

/// Capability to deliver text and documents to the configured recipient.
///
/// Each call is a standalone attempt: no retry, no queuing. A document send
/// is all-or-nothing from the caller's view; if the upload phase fails the
/// message phase is never attempted.
#[async_trait]
pub trait OutboundClient: Send + Sync {
    /// Get the client name (for logging).
    fn name(&self) -> &str;

    /// Send a text message.
    async fn send_text(&self, body: &str) -> Result<SendReceipt, DeliveryError>;

    /// Upload `bytes` as media and send it as a document message.
    async fn send_document(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<SendReceipt, DeliveryError>;
}
