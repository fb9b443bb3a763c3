// src/dag/mod.rs

//! Dependency ordering.
//!
//! - [`sequencer`] expands a request into its transitive dependency closure,
//!   placing every dependency before its dependents, and detects cycles.

pub mod sequencer;

pub use sequencer::sequence;
