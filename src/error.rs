//! Error types for the order portal.

/// Top-level error type for startup and wiring.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Upload directory errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Workbook encode/decode errors.
#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Invalid cell at row {row}, column {column}: {reason}")]
    InvalidCell {
        row: usize,
        column: &'static str,
        reason: String,
    },
}

/// Failure of a single delivery item (one text message or one document).
///
/// Every variant is scoped to the item it was produced for; none of them
/// abort the rest of a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Bad or missing user input, caught before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Media upload failed or did not return a media id.
    #[error("Media upload failed: {reason}")]
    Upload { reason: String },

    /// Network or HTTP failure while sending a message.
    #[error("Message send failed{}: {reason}", status_suffix(.status))]
    Transport { status: Option<u16>, reason: String },

    /// The document could not be generated or staged locally.
    #[error("Document preparation failed: {0}")]
    Preparation(String),
}

impl DeliveryError {
    /// Stable machine-readable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Upload { .. } => "upload_error",
            Self::Transport { .. } => "transport_error",
            Self::Preparation(_) => "preparation_error",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias for the order portal.
pub type Result<T> = std::result::Result<T, Error>;
