use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The drive service answered with a non-success status.
    #[error("Remote rejected request (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// Connectivity problem; callers may fall back to cached artifacts.
    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mirror store error: {0}")]
    Mirror(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure came from connectivity rather than a remote decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::Network("offline".into()).is_transient());
        assert!(!BridgeError::Remote {
            status: 403,
            message: "forbidden".into()
        }
        .is_transient());
        assert!(!BridgeError::NotFound("42".into()).is_transient());
    }
}
