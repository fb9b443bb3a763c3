// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// max_workers = 4
///
/// [command.generate]
/// cmd = "python gen.py"
///
/// [command.compile]
/// cmd = "cc -c foo.c"
/// needs = ["generate"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Worker limit passed through to the runner.
    ///
    /// Unset (or 0) means the runner's default, which is the machine's
    /// available parallelism.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// All commands from `[command.<name>]`.
    ///
    /// Keys are the *command names* (e.g. `"compile"`, `"link"`).
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

/// One `[command.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Shell command line to run for this command.
    pub cmd: String,

    /// Names of commands that must complete before this one may start.
    #[serde(default)]
    pub needs: Vec<String>,
}
