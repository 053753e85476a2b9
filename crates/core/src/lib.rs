//! # voltest-core
//!
//! Integration-test driver for external storage and network subsystems that
//! operate via CLI side effects (Docker volume plugins backed by RBD or NFS).
//! Correctness of the system under test is observed indirectly: process
//! output, mount tables, device listings.
//!
//! The crate is organized around a few cooperating pieces:
//!
//! - [`resource`] manages ephemeral external resources (containers, block
//!   images, mapped devices, mounts) with strict LIFO teardown and
//!   best-effort cleanup on failure.
//! - [`scenario`] defines named test scenarios and the context their bodies
//!   run against.
//! - [`executor`] runs a scenario, guaranteeing teardown on every exit path
//!   including panics.
//! - [`assert`] provides literal-substring and mount-table matchers over
//!   captured command output.
//! - [`registry`] and [`report`] discover scenarios, run them (optionally in
//!   parallel), and aggregate outcomes into a suite report.
//!
//! ## Example
//!
//! ```rust
//! use voltest_core::prelude::*;
//!
//! # fn example() -> voltest_core::Result<()> {
//! let mut suite = SuiteRegistry::new();
//! suite.register(Scenario::new("echo works", |ctx| {
//!     Box::pin(async move {
//!         let out = ctx.run(Command::builder("echo").arg("hello").build()).await?;
//!         assert::contains(&out, "hello")
//!     })
//! }))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod assert;
pub mod error;
pub mod executor;
pub mod naming;
pub mod registry;
pub mod report;
pub mod resource;
pub mod scenario;

pub use error::{Error, Result};
pub use executor::{CancelToken, Executor, Outcome, ScenarioReport};
pub use naming::RunNamer;
pub use registry::SuiteRegistry;
pub use report::SuiteReport;
pub use resource::{ResourceKind, ResourceRecord, ResourceSpec, ResourceStack, ResourceState};
pub use scenario::{Scenario, ScenarioContext, ScenarioParams};

/// Convenience re-exports for suite definitions
pub mod prelude {
    pub use crate::assert;
    pub use crate::error::Result;
    pub use crate::executor::{CancelToken, Executor, Outcome};
    pub use crate::registry::SuiteRegistry;
    pub use crate::resource::{ResourceKind, ResourceSpec};
    pub use crate::scenario::{Scenario, ScenarioContext, ScenarioParams};
    pub use voltest_runner::{Command, CommandResult, Runner};
}
