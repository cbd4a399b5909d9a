//! Workflow Engine
//!
//! Declarative browser workflows for job applications:
//! - a JSON DSL compiled into an immutable [`Command`] tree
//! - an interpreter that walks the tree against one page, threading an
//!   [`ExecutionContext`] of variables through the run
//! - a [`WorkflowRunner`] that owns the browser session lifecycle and per-domain
//!   cookie persistence

pub mod command;
pub mod compiler;
pub mod context;
pub mod errors;
pub mod form;
pub mod interpolate;
pub mod interpreter;
pub mod repository;
pub mod runner;
pub mod session_state;

pub use command::{Command, Flow, PostClickWait};
pub use compiler::compile;
pub use context::{ContextValue, ExecutionContext};
pub use errors::FlowError;
pub use form::{FieldConfig, FieldType, FormConfiguration};
pub use interpolate::interpolate;
pub use interpreter::Interpreter;
pub use repository::{
    FileFormRepository, FileWorkflowRepository, FormSource, MemoryForms, MemoryWorkflows,
    WorkflowSource,
};
pub use runner::WorkflowRunner;
pub use session_state::SessionStateStore;
