// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use cmddag::Registry;

static INIT: Once = Once::new();

/// Initialise a test tracing subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Shared record of which command bodies ran, in completion order.
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn new_run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &RunLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Build a registry where every body just records its own name in `log`.
pub fn recording_registry(commands: &[(&str, &[&str])], log: &RunLog) -> Registry {
    let mut registry = Registry::new();
    for &(name, needs) in commands {
        registry.add(name, needs);
        let log = Arc::clone(log);
        let owned = name.to_string();
        registry.on(name, move || {
            log.lock().unwrap().push(owned.clone());
            Ok(())
        });
    }
    registry
}

/// Convenience: owned command ids from string literals.
pub fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
