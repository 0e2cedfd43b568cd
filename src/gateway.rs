//! Order gateway — turns any order shape into outbound messages.
//!
//! Table, text and file orders all go through [`OrderGateway::submit`]:
//! validate, prepare (compose text, or generate and stage documents), send,
//! and report one [`DeliveryResult`] per item.

use std::sync::Arc;

use crate::error::DeliveryError;
use crate::messaging::OutboundClient;
use crate::order::spreadsheet;
use crate::order::{
    AttachedFile, DeliveryResult, ORDER_LABEL, Order, OrderPayload, OrderRow, TEXT_MESSAGE_LABEL,
};
use crate::storage::{self, UploadStore};

/// Single entry point for submitting orders.
pub struct OrderGateway {
    client: Arc<dyn OutboundClient>,
    store: UploadStore,
}

impl OrderGateway {
    pub fn new(client: Arc<dyn OutboundClient>, store: UploadStore) -> Self {
        Self { client, store }
    }

    /// Submit an order.
    ///
    /// A rejected order yields exactly one validation result and makes no
    /// outbound call. Otherwise there is one result per item sent, in input
    /// order; a failed item never stops the ones after it.
    pub async fn submit(&self, order: Order) -> Vec<DeliveryResult> {
        if let Err(e) = order.validate() {
            tracing::warn!(
                retailer = order.retailer(),
                mode = order.payload.mode(),
                error = %e,
                "Order rejected"
            );
            return vec![DeliveryResult::failure(ORDER_LABEL, e)];
        }

        tracing::info!(
            retailer = order.retailer(),
            mode = order.payload.mode(),
            client = self.client.name(),
            "Submitting order"
        );

        let results = match &order.payload {
            OrderPayload::Tabular(rows) => vec![self.send_table(&order, rows).await],
            OrderPayload::Text(text) => vec![self.send_text(&order, text).await],
            OrderPayload::Files(files) => self.send_files(files).await,
        };

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed == 0 {
            tracing::info!(retailer = order.retailer(), items = results.len(), "Order delivered");
        } else {
            tracing::warn!(
                retailer = order.retailer(),
                items = results.len(),
                failed,
                "Order delivered with failures"
            );
        }
        results
    }

    async fn send_table(&self, order: &Order, rows: &[OrderRow]) -> DeliveryResult {
        let file_name = order.workbook_file_name();

        let bytes = match spreadsheet::write_workbook(rows) {
            Ok(b) => b,
            Err(e) => {
                return failed(&file_name, DeliveryError::Preparation(e.to_string()));
            }
        };

        // The staged name may differ from the generated one on collision.
        let label = match self.store.stage(&file_name, &bytes).await {
            Ok(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
                .unwrap_or(file_name),
            Err(e) => {
                return failed(&file_name, DeliveryError::Preparation(e.to_string()));
            }
        };

        self.send_document(label, bytes).await
    }

    async fn send_text(&self, order: &Order, text: &str) -> DeliveryResult {
        let body = order.text_message(text);
        match self.client.send_text(&body).await {
            Ok(receipt) => DeliveryResult::success(TEXT_MESSAGE_LABEL, receipt.response),
            Err(e) => failed(TEXT_MESSAGE_LABEL, e),
        }
    }

    async fn send_files(&self, files: &[AttachedFile]) -> Vec<DeliveryResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.send_file(file).await);
        }
        results
    }

    /// Stage one upload and send it under its bare file name.
    async fn send_file(&self, file: &AttachedFile) -> DeliveryResult {
        let name = match storage::sanitize_file_name(&file.file_name) {
            Ok(name) => name,
            Err(e) => return failed(&file.file_name, DeliveryError::Preparation(e.to_string())),
        };

        match self.store.stage(&name, &file.bytes).await {
            Ok(path) => {
                tracing::debug!(file_name = %name, path = %path.display(), "File staged");
                self.send_document(name, file.bytes.clone()).await
            }
            Err(e) => failed(&name, DeliveryError::Preparation(e.to_string())),
        }
    }

    async fn send_document(&self, label: String, bytes: Vec<u8>) -> DeliveryResult {
        match self.client.send_document(bytes, &label).await {
            Ok(receipt) => DeliveryResult::success(label, receipt.response),
            Err(e) => failed(&label, e),
        }
    }
}

fn failed(label: &str, error: DeliveryError) -> DeliveryResult {
    tracing::warn!(target_label = label, kind = error.kind(), error = %error, "Delivery failed");
    DeliveryResult::failure(label, error)
}
