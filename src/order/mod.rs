//! Order model: the three payload shapes and per-item delivery results.

pub mod spreadsheet;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// Maximum body length of a vendor text message.
pub const MAX_TEXT_MESSAGE_LENGTH: usize = 4096;

/// Label used for results of a text order.
pub const TEXT_MESSAGE_LABEL: &str = "text message";

/// Label used for the single result of a rejected order.
pub const ORDER_LABEL: &str = "order";

/// One user-submitted request to forward content to the fixed recipient.
#[derive(Debug, Clone)]
pub struct Order {
    pub retailer_name: String,
    pub submitted_at: DateTime<Utc>,
    pub payload: OrderPayload,
}

impl Order {
    /// Create an order stamped with the current time.
    pub fn new(retailer_name: impl Into<String>, payload: OrderPayload) -> Self {
        Self {
            retailer_name: retailer_name.into(),
            submitted_at: Utc::now(),
            payload,
        }
    }

    pub fn with_submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }

    /// Retailer name with surrounding whitespace removed.
    pub fn retailer(&self) -> &str {
        self.retailer_name.trim()
    }

    /// Check the order is submittable. Runs before any file is written or
    /// any network call is made.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.retailer().is_empty() {
            return Err(DeliveryError::Validation(
                "retailer name is required".into(),
            ));
        }

        match &self.payload {
            OrderPayload::Tabular(rows) => {
                if rows.is_empty() {
                    return Err(DeliveryError::Validation(
                        "order table has no rows".into(),
                    ));
                }
            }
            OrderPayload::Text(text) => {
                if text.trim().is_empty() {
                    return Err(DeliveryError::Validation(
                        "order text is empty".into(),
                    ));
                }
                let length = self.text_message(text).chars().count();
                if length > MAX_TEXT_MESSAGE_LENGTH {
                    return Err(DeliveryError::Validation(format!(
                        "order message is {length} characters, limit is {MAX_TEXT_MESSAGE_LENGTH}"
                    )));
                }
            }
            OrderPayload::Files(files) => {
                if files.is_empty() {
                    return Err(DeliveryError::Validation(
                        "at least one file is required".into(),
                    ));
                }
                for file in files {
                    DocumentKind::from_file_name(&file.file_name)?;
                }
            }
        }
        Ok(())
    }

    /// Compose the outbound text body for a free-text order. The retailer
    /// name is used as entered.
    pub fn text_message(&self, text: &str) -> String {
        format!("New Order from {}:\n\n{}", self.retailer_name, text)
    }

    /// File name of the workbook generated for a tabular order.
    pub fn workbook_file_name(&self) -> String {
        format!(
            "order_{}_{}.xlsx",
            slug(self.retailer()),
            self.submitted_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Shape of the order content.
#[derive(Debug, Clone)]
pub enum OrderPayload {
    /// Spreadsheet-like rows, sent as one generated workbook.
    Tabular(Vec<OrderRow>),
    /// Free-form text, sent as one text message.
    Text(String),
    /// Attached files, each sent as its own document.
    Files(Vec<AttachedFile>),
}

impl OrderPayload {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "table",
            Self::Text(_) => "text",
            Self::Files(_) => "files",
        }
    }
}

/// One line of a tabular order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub item: String,
    pub quantity: u32,
    #[serde(default)]
    pub remarks: String,
}

impl OrderRow {
    pub fn new(item: impl Into<String>, quantity: u32, remarks: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity,
            remarks: remarks.into(),
        }
    }
}

/// A user-uploaded file.
#[derive(Clone)]
pub struct AttachedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AttachedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

impl fmt::Debug for AttachedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Accepted document types, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Xlsx,
    Xls,
    Pdf,
    Docx,
    Jpeg,
    Png,
}

impl DocumentKind {
    /// Extensions accepted for uploaded files.
    pub const ALLOWED_EXTENSIONS: &'static [&'static str] =
        &["xlsx", "xls", "pdf", "docx", "jpg", "jpeg", "png", "jfif"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "jpg" | "jpeg" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Resolve the kind from a file name, rejecting anything outside the
    /// accepted set.
    pub fn from_file_name(file_name: &str) -> Result<Self, DeliveryError> {
        file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
            .ok_or_else(|| {
                DeliveryError::Validation(format!(
                    "{file_name:?} is not an accepted file type (allowed: {})",
                    Self::ALLOWED_EXTENSIONS.join(", ")
                ))
            })
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Outcome of sending one discrete item.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryResult {
    /// File name, "text message", or "order" for a rejected order.
    pub target_label: String,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Raw vendor response of the final request.
    Success(serde_json::Value),
    Failure(DeliveryError),
}

impl DeliveryResult {
    pub fn success(target_label: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            target_label: target_label.into(),
            outcome: DeliveryOutcome::Success(response),
        }
    }

    pub fn failure(target_label: impl Into<String>, error: DeliveryError) -> Self {
        Self {
            target_label: target_label.into(),
            outcome: DeliveryOutcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&DeliveryError> {
        match &self.outcome {
            DeliveryOutcome::Failure(e) => Some(e),
            DeliveryOutcome::Success(_) => None,
        }
    }
}

/// Reduce free text to something safe inside a file name.
pub(crate) fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "retailer".to_string()
    } else {
        trimmed.to_string()
    }
}
