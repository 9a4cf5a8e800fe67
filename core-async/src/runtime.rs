//! Runtime utilities.
//!
//! [`DedicatedRuntime`] owns a single-threaded Tokio runtime on its own OS
//! thread. Tasks spawned on it run strictly one at a time and interleave only
//! at await points, which gives the provider one sequential background
//! context regardless of how the host drives the public API.

use std::future::Future;
use std::io;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use tokio::sync::oneshot;
use tracing::{debug, warn};

pub use tokio::runtime::{Builder, Handle, Runtime};

use crate::task::JoinHandle;

/// Runs the provided future to completion on a throwaway current-thread runtime.
pub fn block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// Sequential background execution context.
pub struct DedicatedRuntime {
    name: String,
    handle: Handle,
    thread_id: Option<ThreadId>,
    worker: Mutex<Option<Worker>>,
}

impl DedicatedRuntime {
    /// Start a current-thread runtime on a new OS thread named `name`.
    pub fn start(name: &str) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let (shutdown, stopped) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let _ = stopped.await;
                });
                // Dropping the runtime cancels whatever is still queued.
                drop(runtime);
            })?;

        debug!(runtime = name, "Started dedicated runtime");

        Ok(Self {
            name: name.to_string(),
            handle,
            thread_id: Some(thread.thread().id()),
            worker: Mutex::new(Some(Worker { shutdown, thread })),
        })
    }

    /// Run on an existing runtime instead of owning a thread.
    ///
    /// Used by tests that drive everything from `#[tokio::test]`.
    pub fn from_handle(name: &str, handle: Handle) -> Self {
        Self {
            name: name.to_string(),
            handle,
            thread_id: None,
            worker: Mutex::new(None),
        }
    }

    /// Run on the runtime the caller is currently inside.
    pub fn current(name: &str) -> io::Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
        Ok(Self::from_handle(name, handle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a task on this context.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Stop the owned thread, cancelling pending tasks. Idempotent.
    pub fn shutdown(&self) {
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };

        let _ = worker.shutdown.send(());

        // A task on this runtime dropping the last reference must not join itself.
        if self.thread_id == Some(thread::current().id()) {
            return;
        }
        if worker.thread.join().is_err() {
            warn!(runtime = %self.name, "Dedicated runtime thread panicked");
        } else {
            debug!(runtime = %self.name, "Stopped dedicated runtime");
        }
    }
}

impl Drop for DedicatedRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DedicatedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedicatedRuntime")
            .field("name", &self.name)
            .field("owns_thread", &self.thread_id.is_some())
            .finish()
    }
}
