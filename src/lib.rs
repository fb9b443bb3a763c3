// src/lib.rs

//! Dependency-ordered concurrent command execution.
//!
//! `cmddag` schedules uniquely named commands that form a dependency graph:
//! a request is expanded to its transitive dependency closure, ordered so
//! that every dependency precedes its dependents, and executed on a bounded
//! worker pool. No command starts before all of its declared dependencies
//! have completed; the first body failure stops new dispatch and surfaces
//! to the caller once in-flight work has drained.
//!
//! The pieces:
//! - the [`CommandSource`] trait and in-memory [`Registry`] of closures and
//!   shell commands (`registry`)
//! - deterministic topological ordering with cycle detection (`dag`)
//! - the [`Runner`] with its coordinating loop, dispatch scan and bounded
//!   workers (`engine`)
//! - TOML command sets, `[command.<name>]` with `cmd` and `needs` (`config`)
//! - shell execution for config-defined command bodies (`exec`)

pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::loader::load_and_validate;

pub use crate::dag::sequence;
pub use crate::engine::{Runner, RunnerOptions};
pub use crate::errors::{CycleError, RunError};
pub use crate::registry::{CommandId, CommandSource, Registry};

/// High-level entry point: load a config file, build a shell-command
/// registry from it, and run the requested commands (or every configured
/// command when `requested` is `None`).
///
/// `max_workers` from the config applies unless the caller set one in
/// `options`.
pub async fn run_from_config(
    config_path: impl AsRef<Path>,
    requested: Option<Vec<CommandId>>,
    mut options: RunnerOptions,
) -> Result<()> {
    let cfg = load_and_validate(config_path)?;

    if options.max_workers.is_none() {
        options.max_workers = cfg.max_workers;
    }

    let registry = Registry::from_config(&cfg);
    let requested = requested.unwrap_or_else(|| registry.names());

    info!(?requested, "running commands from config");

    let runner = Runner::new(Arc::new(registry), options);
    runner.run(&requested).await?;
    Ok(())
}
