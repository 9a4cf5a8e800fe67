use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentsError {
    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),

    /// The operand does not resolve in the local mirror.
    #[error("Document not found: {document_id}")]
    NotFound { document_id: String },

    /// The drive service rejected the operation.
    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// Network failure with no cached artifact to fall back to.
    #[error("Content unavailable: {0}")]
    Unavailable(String),

    /// Search needs a concrete folder as listing context.
    #[error("Select a folder inside a drive before searching")]
    SelectionRequired,

    #[error("No thumbnail available for {0}")]
    ThumbnailUnsupported(String),

    #[error("{operation} is not supported for {document_id}")]
    Unsupported {
        operation: String,
        document_id: String,
    },

    #[error("Invalid open mode: {0}")]
    InvalidMode(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl DocumentsError {
    pub fn not_found(document_id: impl ToString) -> Self {
        Self::NotFound {
            document_id: document_id.to_string(),
        }
    }

    pub fn unsupported(operation: &str, document_id: impl ToString) -> Self {
        Self::Unsupported {
            operation: operation.to_string(),
            document_id: document_id.to_string(),
        }
    }

    /// Mutation failures always surface as a generic operation failure.
    pub fn operation_failed(operation: &str, error: BridgeError) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    /// Read-side mapping: connectivity problems become `Unavailable`.
    pub fn from_read(operation: &str, error: BridgeError) -> Self {
        if error.is_transient() {
            Self::Unavailable(error.to_string())
        } else {
            Self::operation_failed(operation, error)
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumentsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mapping() {
        let network = DocumentsError::from_read("open", BridgeError::Network("offline".into()));
        assert!(matches!(network, DocumentsError::Unavailable(_)));

        let rejected = DocumentsError::from_read(
            "open",
            BridgeError::Remote {
                status: 403,
                message: "forbidden".into(),
            },
        );
        assert!(matches!(rejected, DocumentsError::OperationFailed { .. }));
    }

    #[test]
    fn test_operation_failed_message() {
        let err = DocumentsError::operation_failed(
            "rename",
            BridgeError::Network("connection reset".into()),
        );
        assert_eq!(err.to_string(), "rename failed: Network unavailable: connection reset");
    }
}
