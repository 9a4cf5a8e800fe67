//! Async runtime seam for the document provider core.
//!
//! All core-* crates depend on this crate instead of reaching for tokio
//! directly, so the executor choice lives in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeouts and a pausable `Instant`
//! - `sync`: Async locks, channels and `CancellationToken`
//! - `io`: Async read/write traits
//! - `runtime`: [`DedicatedRuntime`](runtime::DedicatedRuntime), the single
//!   sequential execution context that runs all remote-originated work
//!
//! # Examples
//!
//! ```rust
//! use core_async::runtime::DedicatedRuntime;
//!
//! let background = DedicatedRuntime::start("docs-bg").unwrap();
//! let handle = background.spawn(async { 21 * 2 });
//! assert_eq!(core_async::runtime::block_on(handle).unwrap().unwrap(), 42);
//! ```

pub mod io;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
