// src/errors.rs

//! Crate-wide error types.
//!
//! Command bodies and config loading report rich context via `anyhow`; the
//! public seams of the crate (sequencer, runner) use structured types so
//! callers can match on the failure kind.

use thiserror::Error;

use crate::registry::CommandId;

pub use anyhow::{Error, Result};

/// Returned by the sequencer when the dependency closure of a request
/// contains a cycle.
///
/// This is recovered inside [`crate::engine::Runner::run`] (it falls back to
/// direct execution of the requested ids) and only surfaces to callers that
/// invoke the sequencer directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dependency cycle reachable from command '{id}'")]
pub struct CycleError {
    /// The command that was reached again while still on the expansion stack.
    pub id: CommandId,
}

/// Session-level failure returned by [`crate::engine::Runner::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// A command body returned an error.
    ///
    /// If several commands fail in the same session, only the first one in
    /// submission order is reported; the rest are logged and discarded.
    #[error("command '{id}' failed")]
    Command {
        id: CommandId,
        #[source]
        source: anyhow::Error,
    },

    /// The dispatch scan found nothing runnable while nothing was in flight
    /// and the session was not finished.
    ///
    /// Unreachable for a well-behaved [`crate::registry::CommandSource`]
    /// whose dependency lists are stable for the duration of one session.
    #[error("scheduling stalled: no runnable command and none in flight")]
    Stalled,
}
