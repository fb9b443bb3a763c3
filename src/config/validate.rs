// src/config/validate.rs

use anyhow::{Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one command
/// - all `needs` references refer to existing commands
///
/// Cycles in the `needs` graph are *not* an error here: the runner has a
/// defined behaviour for a cyclic request (it executes the requested ids
/// directly, skipping dependency expansion), so a cyclic config must load.
/// We still detect them and warn, since the fallback ignores every
/// dependency edge and that is rarely what the config author meant.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_commands(cfg)?;
    validate_needs_references(cfg)?;
    warn_on_cycles(cfg);
    Ok(())
}

fn ensure_has_commands(cfg: &ConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [command.<name>] section"
        ));
    }
    Ok(())
}

fn validate_needs_references(cfg: &ConfigFile) -> Result<()> {
    for (name, command) in cfg.command.iter() {
        for dep in command.needs.iter() {
            if !cfg.command.contains_key(dep) {
                return Err(anyhow!(
                    "command '{}' has unknown dependency '{}' in `needs`",
                    name,
                    dep
                ));
            }
        }
    }
    Ok(())
}

fn warn_on_cycles(cfg: &ConfigFile) {
    // Build a petgraph graph from the commands and their dependencies.
    //
    // Edge direction: dep -> command
    // For:
    //   [command.link]
    //   needs = ["compile"]
    // we add edge compile -> link.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.command.keys() {
        graph.add_node(name.as_str());
    }

    for (name, command) in cfg.command.iter() {
        for dep in command.needs.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort fails iff there is a cycle.
    if let Err(cycle) = toposort(&graph, None) {
        tracing::warn!(
            command = %cycle.node_id(),
            "dependency cycle in config; affected requests will run without dependency expansion"
        );
    }
}
