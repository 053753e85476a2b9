//! Command execution for integration tests against external CLI tools
//!
//! This crate runs host-level commands (`docker`, `rbd`, `mount`, ...) and
//! captures their combined stdout+stderr for later inspection. Commands are
//! built as structured argv vectors; going through a shell is an explicit
//! opt-in for pipelines and redirection, never inferred.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod output;
pub mod runner;

pub use command::Command;
pub use error::{Error, Result};
pub use output::CommandResult;
pub use runner::Runner;
