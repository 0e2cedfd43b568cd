//! WhatsApp Cloud API client.
//!
//! Text goes straight to `/{phone_number_id}/messages`. Documents take two
//! requests: a multipart upload to `/{phone_number_id}/media` that yields a
//! media id, then a `document` message referencing that id.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;

use super::{OutboundClient, SendReceipt};
use crate::config::MessagingConfig;
use crate::error::DeliveryError;
use crate::order::DocumentKind;

/// MIME type announced for files outside the accepted set.
const FALLBACK_MIME: &str = "application/octet-stream";

/// WhatsApp client bound to one sender phone number and one recipient.
pub struct WhatsAppClient {
    config: MessagingConfig,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}/{endpoint}",
            self.config.api_base_url, self.config.api_version, self.config.phone_number_id
        )
    }

    /// Phase one of a document send: upload the bytes, return the media id.
    async fn upload_media(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, DeliveryError> {
        let mime = DocumentKind::from_file_name(file_name)
            .map(DocumentKind::mime_type)
            .unwrap_or(FALLBACK_MIME);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| DeliveryError::Upload {
                reason: e.to_string(),
            })?;

        let form = Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime)
            .part("file", part);

        let resp = self
            .client
            .post(self.api_url("media"))
            .bearer_auth(self.config.access_token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeliveryError::Upload {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = read_body(resp).await;

        if !status.is_success() {
            return Err(DeliveryError::Upload {
                reason: format!("{status}: {body}"),
            });
        }

        body.get("id")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| DeliveryError::Upload {
                reason: format!("no media id in response: {body}"),
            })
    }

    /// Post a message body to the messages endpoint.
    async fn post_message(&self, payload: serde_json::Value) -> Result<SendReceipt, DeliveryError> {
        let resp = self
            .client
            .post(self.api_url("messages"))
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                status: None,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = read_body(resp).await;

        if !status.is_success() {
            return Err(DeliveryError::Transport {
                status: Some(status.as_u16()),
                reason: body.to_string(),
            });
        }

        Ok(SendReceipt::from_response(body))
    }
}

#[async_trait]
impl OutboundClient for WhatsAppClient {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send_text(&self, body: &str) -> Result<SendReceipt, DeliveryError> {
        let receipt = self
            .post_message(text_payload(&self.config.recipient, body))
            .await?;
        tracing::info!(
            message_id = receipt.message_id.as_deref().unwrap_or("unknown"),
            "WhatsApp text sent"
        );
        Ok(receipt)
    }

    async fn send_document(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<SendReceipt, DeliveryError> {
        let media_id = self.upload_media(bytes, file_name).await?;
        tracing::debug!(file_name, media_id = %media_id, "WhatsApp media uploaded");

        let receipt = self
            .post_message(document_payload(
                &self.config.recipient,
                &media_id,
                file_name,
            ))
            .await?
            .with_media_id(media_id);

        tracing::info!(
            file_name,
            message_id = receipt.message_id.as_deref().unwrap_or("unknown"),
            "WhatsApp document sent"
        );
        Ok(receipt)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn text_payload(to: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": body }
    })
}

fn document_payload(to: &str, media_id: &str, file_name: &str) -> serde_json::Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "document",
        "document": { "id": media_id, "filename": file_name }
    })
}

/// Decode a response body as JSON, keeping non-JSON bodies as a string.
async fn read_body(resp: reqwest::Response) -> serde_json::Value {
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

// ── Tests ───────────────────────────────────────────────────────────
