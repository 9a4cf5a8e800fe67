//! # Event Bus System
//!
//! Event-driven notifications from the document provider core to the host
//! using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The core never talks to the OS notification API directly. Listing
//! population, mutations and the content layer emit typed events here; the
//! host subscribes and turns [`DocumentEvent::Changed`] into OS change
//! notifications on the rendered [`ChangeAddress`] URI.
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Cursor Engine├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │     subscribe    ┌──────────────┐
//! ┌──────────────┐     emit      │ (broadcast├─────────────────>│ Host notifier│
//! │ Mutations    ├──────────────>│  channel) │                  └──────────────┘
//! └──────────────┘               │           │
//! ┌──────────────┐     emit      │           │
//! │ Content      ├──────────────>│           │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ChangeAddress, CoreEvent, DocumentEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Documents(DocumentEvent::Changed {
//!         address: ChangeAddress::Children {
//!             parent: "7/Work@42/1".to_string(),
//!         },
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Documents(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Change
//!   notifications are idempotent, so a lagging host can simply re-query.
//! - **`RecvError::Closed`**: the provider shut down.
//!
//! Emitting with no subscriber returns an error; callers ignore it with
//! `.ok()` because notifications are best-effort.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Listing and document-tree changes
    Documents(DocumentEvent),
    /// Content transfers (downloads, staged uploads)
    Transfer(TransferEvent),
    /// Conditions the host must surface to the user
    Host(HostEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Documents(e) => e.description(),
            CoreEvent::Transfer(e) => e.description(),
            CoreEvent::Host(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Documents(DocumentEvent::ListingFailed { .. }) => EventSeverity::Error,
            CoreEvent::Transfer(TransferEvent::WriteFailed { .. }) => EventSeverity::Error,
            CoreEvent::Host(HostEvent::BackgroundPermissionMissing { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Transfer(TransferEvent::UploadQueued { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Change Addresses
// ============================================================================

/// The address the OS should re-read after a change.
///
/// Rendered into a `content://<authority>/...` URI with [`ChangeAddress::to_uri`].
/// Document ids contain `/`, so they are percent-encoded into a single path
/// segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeAddress {
    /// The root list
    Roots,
    /// The children listing of a folder
    Children { parent: String },
    /// A single document
    Document { id: String },
    /// A search listing of a root
    Search { root_id: String, query: String },
}

impl ChangeAddress {
    pub fn children(parent: impl Into<String>) -> Self {
        Self::Children {
            parent: parent.into(),
        }
    }

    pub fn document(id: impl Into<String>) -> Self {
        Self::Document { id: id.into() }
    }

    pub fn search(root_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Search {
            root_id: root_id.into(),
            query: query.into(),
        }
    }

    /// Renders the notification URI for `authority`.
    ///
    /// ```rust
    /// use core_runtime::events::ChangeAddress;
    ///
    /// let uri = ChangeAddress::children("7/Work@42/1").to_uri("drive.documents").unwrap();
    /// assert_eq!(uri.as_str(), "content://drive.documents/document/7%2FWork@42%2F1/children");
    /// ```
    pub fn to_uri(&self, authority: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("content://{authority}/"))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.clear();
            match self {
                ChangeAddress::Roots => {
                    segments.push("root");
                }
                ChangeAddress::Children { parent } => {
                    segments.extend(["document", parent.as_str(), "children"]);
                }
                ChangeAddress::Document { id } => {
                    segments.extend(["document", id.as_str()]);
                }
                ChangeAddress::Search { root_id, .. } => {
                    segments.extend(["root", root_id.as_str(), "search"]);
                }
            }
        }
        if let ChangeAddress::Search { query, .. } = self {
            url.query_pairs_mut().append_pair("query", query);
        }
        Ok(url)
    }
}

impl fmt::Display for ChangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAddress::Roots => write!(f, "roots"),
            ChangeAddress::Children { parent } => write!(f, "children({parent})"),
            ChangeAddress::Document { id } => write!(f, "document({id})"),
            ChangeAddress::Search { root_id, query } => write!(f, "search({root_id}, {query:?})"),
        }
    }
}

// ============================================================================
// Document Events
// ============================================================================

/// Events the host maps to OS change notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DocumentEvent {
    /// Rows behind `address` changed; the OS should re-read it.
    Changed { address: ChangeAddress },
    /// Population of a listing stopped on an error. A final `Changed` for the
    /// same address follows so the OS sees the loading flag cleared.
    ListingFailed {
        address: ChangeAddress,
        message: String,
    },
}

impl DocumentEvent {
    fn description(&self) -> &str {
        match self {
            DocumentEvent::Changed { .. } => "Documents changed",
            DocumentEvent::ListingFailed { .. } => "Listing failed",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

/// Events related to file content moving between remote and local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    /// A download into the content cache finished.
    DownloadCompleted {
        document_id: String,
        /// Bytes written to the cache
        bytes: u64,
    },
    /// A staged write was handed to the background upload queue.
    UploadQueued {
        parent_document_id: String,
        file_name: String,
    },
    /// A staged write closed with an error; nothing was uploaded.
    WriteFailed {
        document_id: String,
        message: String,
    },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::DownloadCompleted { .. } => "Download completed",
            TransferEvent::UploadQueued { .. } => "Upload queued",
            TransferEvent::WriteFailed { .. } => "Staged write failed",
        }
    }
}

// ============================================================================
// Host Events
// ============================================================================

/// Conditions that need a user-facing notification rather than a call failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// The OS does not let the upload queue run in the background.
    BackgroundPermissionMissing {
        /// Name of the file whose upload was queued anyway
        file_name: String,
    },
}

impl HostEvent {
    fn description(&self) -> &str {
        match self {
            HostEvent::BackgroundPermissionMissing { .. } => {
                "Background upload permission missing"
            }
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clones share the same channel. Each `subscribe()` creates an independent
/// receiver that sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Shorthand for emitting [`DocumentEvent::Changed`].
    pub fn notify_changed(&self, address: ChangeAddress) {
        self.emit(CoreEvent::Documents(DocumentEvent::Changed { address }))
            .ok();
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let changes = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Documents(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
