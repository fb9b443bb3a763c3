// src/dag/sequencer.rs

use std::collections::HashSet;

use crate::errors::CycleError;
use crate::registry::{CommandId, CommandSource};

/// Expand `requested` into a linear order over its transitive dependency
/// closure under `source`, or fail with [`CycleError`] if a cycle is
/// reachable from the request.
///
/// Properties of the returned order:
/// - every dependency of a placed command appears strictly before it;
/// - no duplicates, even if the request or dependency lists repeat ids;
/// - independent siblings keep first-encountered order, so the result is
///   deterministic for a fixed request and a fixed `dependencies_of`.
///
/// An empty request yields an empty order. A command that depends on itself,
/// directly or transitively, is a cycle. On a cycle nothing is returned;
/// the partial traversal is discarded.
pub fn sequence<S>(requested: &[CommandId], source: &S) -> Result<Vec<CommandId>, CycleError>
where
    S: CommandSource + ?Sized,
{
    let mut results = Vec::new();
    let mut placed = HashSet::new();
    let mut nest = Vec::new();
    expand(requested, source, &mut results, &mut placed, &mut nest)?;
    Ok(results)
}

/// Depth-first expansion.
///
/// `nest` is the chain of commands currently being expanded (the recursion
/// stack); meeting one of them again means a cycle. `placed` mirrors
/// `results` for O(1) membership checks.
fn expand<S>(
    commands: &[CommandId],
    source: &S,
    results: &mut Vec<CommandId>,
    placed: &mut HashSet<CommandId>,
    nest: &mut Vec<CommandId>,
) -> Result<(), CycleError>
where
    S: CommandSource + ?Sized,
{
    for command in commands {
        if placed.contains(command) {
            // Already placed by an earlier request entry or dependency.
            continue;
        }
        if nest.contains(command) {
            return Err(CycleError {
                id: command.clone(),
            });
        }

        let needs = source.dependencies_of(command);
        if !needs.is_empty() {
            nest.push(command.clone());
            expand(&needs, source, results, placed, nest)?;
            nest.pop();
        }

        results.push(command.clone());
        placed.insert(command.clone());
    }
    Ok(())
}
