// src/registry.rs

//! The command registry: where commands, their bodies, and their declared
//! dependencies live.
//!
//! The engine never inspects what a command *does*; it only needs the three
//! queries on [`CommandSource`]. [`Registry`] is the in-memory implementation
//! used by the config layer and by tests; embedding systems with their own
//! command store implement the trait directly.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use anyhow::{Result, bail};
use tracing::debug;

use crate::exec;

/// Public type alias for command identifiers throughout the crate.
pub type CommandId = String;

/// The capability surface the engine schedules against.
///
/// Implementations must be internally synchronized: `run_one` is invoked
/// from worker threads, up to the configured concurrency limit, though never
/// twice concurrently for the same id within one session.
pub trait CommandSource: Send + Sync + 'static {
    /// Declared direct dependencies of `id`, in declaration order.
    ///
    /// Unknown ids yield an empty list; the list must be stable for the
    /// duration of one `run` call.
    fn dependencies_of(&self, id: &str) -> Vec<CommandId>;

    /// Execute the body of `id` once. Blocking is fine; the engine runs this
    /// on the blocking pool.
    fn run_one(&self, id: &str) -> Result<()>;

    /// Whether `id` has already completed outside the current session.
    ///
    /// Consulted before dispatch so that already-satisfied commands are
    /// skipped, which lets multiple sessions compose over one long-lived
    /// source.
    fn has_completed(&self, id: &str) -> bool;
}

type CommandBody = Box<dyn Fn() -> Result<()> + Send + Sync>;

struct CommandSpec {
    needs: Vec<CommandId>,
    body: Option<CommandBody>,
}

/// In-memory [`CommandSource`].
///
/// Commands are registered with [`add`](Registry::add) (dependencies only,
/// no-op body), given a body with [`on`](Registry::on) or
/// [`shell`](Registry::shell), and remembered in a completion set once their
/// body returns successfully.
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<CommandId, CommandSpec>,
    /// Commands whose body has run successfully. Outlives individual runs,
    /// so a second session over the same registry skips them.
    completed: Mutex<HashSet<CommandId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a registry of shell commands from a validated
    /// [`ConfigFile`](crate::config::ConfigFile).
    pub fn from_config(cfg: &crate::config::ConfigFile) -> Self {
        let mut registry = Self::new();
        for (name, command) in cfg.command.iter() {
            let needs: Vec<&str> = command.needs.iter().map(|s| s.as_str()).collect();
            registry.shell(name, &needs, &command.cmd);
        }
        registry
    }

    /// Register a command with the given dependencies and a no-op body.
    ///
    /// A command that exists purely to group its dependencies needs nothing
    /// more; call [`on`](Registry::on) to install real work. Re-adding an
    /// existing command replaces its dependency list and keeps its body.
    pub fn add(&mut self, name: &str, needs: &[&str]) -> &mut Self {
        let needs: Vec<CommandId> = needs.iter().map(|s| s.to_string()).collect();
        match self.commands.get_mut(name) {
            Some(spec) => spec.needs = needs,
            None => {
                self.commands
                    .insert(name.to_string(), CommandSpec { needs, body: None });
            }
        }
        self
    }

    /// Install (or replace) the body of `name`, registering it with no
    /// dependencies if it does not exist yet.
    pub fn on<F>(&mut self, name: &str, body: F) -> &mut Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let spec = self
            .commands
            .entry(name.to_string())
            .or_insert_with(|| CommandSpec {
                needs: Vec::new(),
                body: None,
            });
        spec.body = Some(Box::new(body));
        self
    }

    /// Register a command whose body runs `cmdline` through the platform
    /// shell (see [`exec::run_shell`]).
    pub fn shell(&mut self, name: &str, needs: &[&str], cmdline: &str) -> &mut Self {
        self.add(name, needs);
        let owned_name = name.to_string();
        let cmdline = cmdline.to_string();
        self.on(name, move || exec::run_shell(&owned_name, &cmdline));
        self
    }

    /// All registered command names, in registration-key order.
    pub fn names(&self) -> Vec<CommandId> {
        self.commands.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Seed the completion set, e.g. when the embedding system knows a
    /// command's output is already up to date.
    pub fn mark_completed(&self, name: &str) {
        self.completed.lock().unwrap().insert(name.to_string());
    }

    /// Snapshot of every command marked completed so far.
    pub fn completed_ids(&self) -> Vec<CommandId> {
        let completed = self.completed.lock().unwrap();
        let mut ids: Vec<CommandId> = completed.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl CommandSource for Registry {
    fn dependencies_of(&self, id: &str) -> Vec<CommandId> {
        self.commands
            .get(id)
            .map(|spec| spec.needs.clone())
            .unwrap_or_default()
    }

    fn run_one(&self, id: &str) -> Result<()> {
        let Some(spec) = self.commands.get(id) else {
            bail!("unknown command '{id}'");
        };

        if let Some(body) = &spec.body {
            body()?;
        } else {
            debug!(command = %id, "command has no body; dependencies only");
        }

        self.completed.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    fn has_completed(&self, id: &str) -> bool {
        self.completed.lock().unwrap().contains(id)
    }
}
