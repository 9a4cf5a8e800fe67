//! Host Integration Abstractions
//!
//! Account listing, background uploads and failure telemetry provided by the
//! host application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// A locally signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub display_name: String,
    pub email: String,
}

/// Account directory
///
/// Lists the accounts known on this device. The list is read on every root
/// enumeration, never cached by the core.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn users(&self) -> Result<Vec<UserAccount>>;
}

/// A create-upload handed to the background sync collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub user_id: i64,
    pub drive_id: i64,
    pub shared_with_me: bool,
    pub parent_id: i64,
    pub file_name: String,
    /// Staged content on local disk.
    pub local_path: PathBuf,
    /// Unix seconds at which the staged write completed.
    pub last_modified: i64,
}

/// Background upload scheduler
///
/// # Platform Notes
///
/// - **Android**: WorkManager job, needs the notification permission to run
///   as a foreground service
/// - **Desktop**: in-process queue
#[async_trait]
pub trait UploadScheduler: Send + Sync {
    /// Queue an upload. The scheduler owns the retry policy.
    async fn enqueue_upload(&self, request: UploadRequest) -> Result<()>;

    /// Whether the OS currently lets uploads run in the background.
    async fn has_background_permission(&self) -> bool {
        true
    }
}

/// Failure telemetry sink (crash/error reporting service).
pub trait FailureReporter: Send + Sync {
    /// Record a failure. Must not fail or block.
    fn report(&self, context: &str, error: &(dyn std::error::Error + 'static));
}
