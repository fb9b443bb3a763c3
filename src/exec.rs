// src/exec.rs

//! Process execution for shell-backed command bodies.
//!
//! This module is responsible for actually running a command line, checking
//! its exit status, and surfacing failures as errors. Bodies built on it are
//! executed on the blocking pool by the engine, so plain `std::process` is
//! the right tool here (no async process handling needed).

use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Run a single shell command line to completion.
///
/// A non-zero exit status is an error carrying the exit code; spawn failures
/// carry the command name as context. Captured stdout/stderr are logged at
/// debug level so failing commands can be diagnosed without inheriting the
/// parent's streams.
pub fn run_shell(name: &str, cmdline: &str) -> Result<()> {
    info!(command = %name, cmd = %cmdline, "starting command process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmdline);
        c
    };

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning process for command '{name}'"))?;

    if !output.stdout.is_empty() {
        debug!(
            command = %name,
            "stdout: {}",
            String::from_utf8_lossy(&output.stdout).trim_end()
        );
    }
    if !output.stderr.is_empty() {
        debug!(
            command = %name,
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }

    let code = output.status.code().unwrap_or(-1);
    info!(
        command = %name,
        exit_code = code,
        success = output.status.success(),
        "command process exited"
    );

    if !output.status.success() {
        bail!("command '{name}' exited with status {code}");
    }

    Ok(())
}
