//! Change notifications towards the host.

use core_runtime::events::{ChangeAddress, CoreEvent, DocumentEvent, EventBus};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::identity::DocumentId;

/// Emits change events on the bus and traces the URI the host will notify.
#[derive(Clone)]
pub struct Notifier {
    bus: EventBus,
    authority: Arc<str>,
}

impl Notifier {
    pub fn new(bus: EventBus, authority: &str) -> Self {
        Self {
            bus,
            authority: Arc::from(authority),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn changed(&self, address: ChangeAddress) {
        match address.to_uri(&self.authority) {
            Ok(uri) => trace!(uri = %uri, "Notifying change"),
            Err(e) => warn!(address = %address, error = %e, "Change address has no valid URI"),
        }
        self.bus.notify_changed(address);
    }

    pub fn children_changed(&self, parent: &DocumentId) {
        self.changed(ChangeAddress::children(parent.as_str()));
    }

    pub fn document_changed(&self, id: &DocumentId) {
        self.changed(ChangeAddress::document(id.as_str()));
    }

    pub fn listing_failed(&self, address: ChangeAddress, message: String) {
        self.emit(CoreEvent::Documents(DocumentEvent::ListingFailed { address, message }));
    }

    /// Best-effort emit; nobody listening is not an error.
    pub fn emit(&self, event: CoreEvent) {
        self.bus.emit(event).ok();
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("authority", &self.authority)
            .field("bus", &self.bus)
            .finish()
    }
}
