// src/engine/mod.rs

//! Concurrent execution engine.
//!
//! This module ties together:
//! - the sequencer's ordering of a request
//! - the per-session status bookkeeping
//! - the coordinating event loop that reacts to worker completions and
//!   dispatches newly-ready commands to a bounded set of workers

pub mod runner;

pub use runner::{Runner, RunnerOptions};
