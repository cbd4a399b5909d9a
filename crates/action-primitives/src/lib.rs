//! Automation driver capability
//!
//! This crate defines the browser operations the workflow interpreter consumes:
//! - page operations: navigate, click, wait, count, fill, select, check, upload, screenshot
//! - session lifecycle: open a session (optionally seeded with cookies), export cookies, close
//! - a closed error taxonomy for driver failures
//!
//! Concrete drivers live in other crates; a scripted driver for tests is available
//! behind the `mock` feature.

pub mod errors;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod primitives;
pub mod types;

pub use errors::*;
pub use primitives::*;
pub use types::*;
