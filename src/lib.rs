//! AutoApply library
//!
//! Configuration, the JSON-file job store and service wiring used by the
//! `autoapply` binary. Exposed for integration testing.

pub mod app_context;
pub mod config;
pub mod storage;

pub use app_context::AppContext;
pub use config::{AppConfig, ConfigError};
pub use storage::JsonFileJobStore;
