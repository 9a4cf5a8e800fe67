use bridge_traits::FailureReporter;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Failure reporter that writes to the tracing pipeline.
///
/// Desktop builds have no crash-reporting service; failures end up in the
/// log and in a counter the host can poll.
#[derive(Debug, Default)]
pub struct TracingFailureReporter {
    reported: AtomicU64,
}

impl TracingFailureReporter {
    pub fn reported_count(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl FailureReporter for TracingFailureReporter {
    fn report(&self, context: &str, err: &(dyn std::error::Error + 'static)) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        error!(context, error = %err, "Reported failure");
    }
}
