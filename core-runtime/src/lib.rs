//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the document provider crates:
//! - Logging and tracing bootstrap
//! - Provider configuration with fail-fast validation
//! - Event bus carrying change notifications for the host

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
